//! # Wound Store
//!
//! The persistence collaborator seen by the evaluator and the registry.
//!
//! [`WoundStore`] is implemented by:
//! - [`MemoryStore`]: in-memory `BTreeMap`s (fast, volatile)
//! - [`crate::storage::RedbStore`]: disk-backed, ACID

use crate::system::ClinicalStage;
use crate::{
    NewTreatment, NewWound, PatientId, Treatment, TreatmentId, Wound, WoundId, WoundcareError,
    sort_most_recent_first,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// STAGE WRITE OUTCOME
// =============================================================================

/// Result of a conditional stage write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageWrite {
    /// The stored stage matched the expectation and was replaced.
    Applied,
    /// Someone changed the stage since it was read; nothing was written.
    Conflict { current: ClinicalStage },
    /// The wound no longer exists.
    Missing,
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Read/write operations on wounds and their treatments.
pub trait WoundStore {
    /// Persist a new wound and return it with its assigned id.
    fn insert_wound(&mut self, new: NewWound, now: DateTime<Utc>)
    -> Result<Wound, WoundcareError>;

    /// Fetch a wound snapshot.
    fn get_wound(&self, id: WoundId) -> Result<Option<Wound>, WoundcareError>;

    /// All wounds, ordered by id.
    fn list_wounds(&self) -> Result<Vec<Wound>, WoundcareError>;

    /// Wounds belonging to one patient, ordered by id.
    fn wounds_for_patient(&self, patient: PatientId) -> Result<Vec<Wound>, WoundcareError> {
        Ok(self
            .list_wounds()?
            .into_iter()
            .filter(|w| w.patient_id == patient)
            .collect())
    }

    /// Overwrite a stored wound. Fails with `WoundNotFound` if absent.
    fn replace_wound(&mut self, wound: &Wound) -> Result<(), WoundcareError>;

    /// Delete a wound and all of its treatments. Returns false if absent.
    fn delete_wound(&mut self, id: WoundId) -> Result<bool, WoundcareError>;

    /// Record a treatment for an existing wound.
    fn insert_treatment(
        &mut self,
        wound_id: WoundId,
        new: NewTreatment,
        now: DateTime<Utc>,
    ) -> Result<Treatment, WoundcareError>;

    /// Treatments of a wound, most-recent-first.
    fn list_treatments_by_wound(&self, id: WoundId) -> Result<Vec<Treatment>, WoundcareError>;

    /// Replace the stage only if it still equals `expected`.
    fn set_stage_if(
        &mut self,
        id: WoundId,
        expected: ClinicalStage,
        stage: ClinicalStage,
        now: DateTime<Utc>,
    ) -> Result<StageWrite, WoundcareError>;

    /// Number of stored wounds.
    fn wound_count(&self) -> Result<usize, WoundcareError>;

    /// Number of stored treatments across all wounds.
    fn treatment_count(&self) -> Result<usize, WoundcareError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory store.
///
/// Uses `BTreeMap` for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    wounds: BTreeMap<WoundId, Wound>,
    treatments: BTreeMap<(WoundId, TreatmentId), Treatment>,
    next_wound_id: u64,
    next_treatment_id: u64,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn treatment_range(
        &self,
        id: WoundId,
    ) -> impl Iterator<Item = (&(WoundId, TreatmentId), &Treatment)> {
        self.treatments
            .range((id, TreatmentId(0))..=(id, TreatmentId(u64::MAX)))
    }
}

impl WoundStore for MemoryStore {
    fn insert_wound(
        &mut self,
        new: NewWound,
        now: DateTime<Utc>,
    ) -> Result<Wound, WoundcareError> {
        let id = WoundId(self.next_wound_id);
        self.next_wound_id = self.next_wound_id.saturating_add(1);
        let wound = Wound::register(id, new, now);
        self.wounds.insert(id, wound.clone());
        Ok(wound)
    }

    fn get_wound(&self, id: WoundId) -> Result<Option<Wound>, WoundcareError> {
        Ok(self.wounds.get(&id).cloned())
    }

    fn list_wounds(&self) -> Result<Vec<Wound>, WoundcareError> {
        Ok(self.wounds.values().cloned().collect())
    }

    fn replace_wound(&mut self, wound: &Wound) -> Result<(), WoundcareError> {
        match self.wounds.get_mut(&wound.id) {
            Some(slot) => {
                *slot = wound.clone();
                Ok(())
            }
            None => Err(WoundcareError::WoundNotFound(wound.id)),
        }
    }

    fn delete_wound(&mut self, id: WoundId) -> Result<bool, WoundcareError> {
        if self.wounds.remove(&id).is_none() {
            return Ok(false);
        }
        let keys: Vec<_> = self.treatment_range(id).map(|(k, _)| *k).collect();
        for key in keys {
            self.treatments.remove(&key);
        }
        Ok(true)
    }

    fn insert_treatment(
        &mut self,
        wound_id: WoundId,
        new: NewTreatment,
        now: DateTime<Utc>,
    ) -> Result<Treatment, WoundcareError> {
        if !self.wounds.contains_key(&wound_id) {
            return Err(WoundcareError::WoundNotFound(wound_id));
        }
        let id = TreatmentId(self.next_treatment_id);
        self.next_treatment_id = self.next_treatment_id.saturating_add(1);
        let treatment = Treatment {
            id,
            wound_id,
            created_at: now,
            notes: new.notes,
            performed_by: new.performed_by,
        };
        self.treatments.insert((wound_id, id), treatment.clone());
        Ok(treatment)
    }

    fn list_treatments_by_wound(&self, id: WoundId) -> Result<Vec<Treatment>, WoundcareError> {
        let mut list: Vec<Treatment> = self.treatment_range(id).map(|(_, t)| t.clone()).collect();
        sort_most_recent_first(&mut list);
        Ok(list)
    }

    fn set_stage_if(
        &mut self,
        id: WoundId,
        expected: ClinicalStage,
        stage: ClinicalStage,
        now: DateTime<Utc>,
    ) -> Result<StageWrite, WoundcareError> {
        let Some(wound) = self.wounds.get_mut(&id) else {
            return Ok(StageWrite::Missing);
        };
        if wound.clinical_stage != expected {
            return Ok(StageWrite::Conflict {
                current: wound.clinical_stage,
            });
        }
        wound.clinical_stage = stage;
        wound.updated_at = now;
        Ok(StageWrite::Applied)
    }

    fn wound_count(&self) -> Result<usize, WoundcareError> {
        Ok(self.wounds.len())
    }

    fn treatment_count(&self) -> Result<usize, WoundcareError> {
        Ok(self.treatments.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
