//! # Registry Module
//!
//! Application service over a [`WoundStore`].
//!
//! The registry is the single entry point used by the HTTP API and the
//! CLI. Recording a treatment triggers a stage evaluation on the same
//! call; the evaluation is best-effort and never undoes the committed
//! treatment.
//!
//! ## Storage Backends
//!
//! - `InMemory`: Uses [`MemoryStore`] (fast, volatile)
//! - `Persistent`: Uses [`RedbStore`] for disk-backed ACID storage
//! - `Custom`: any other [`WoundStore`] supplied by the embedder

use crate::evaluator::{Evaluation, StageEvaluator};
use crate::storage::RedbStore;
use crate::store::{MemoryStore, WoundStore};
use crate::system::{ClinicalStage, StageSummary, StageThresholds};
use crate::{
    NewTreatment, NewWound, PatientId, Treatment, Wound, WoundId, WoundPatch, WoundcareError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage backend for a Registry.
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
    /// Caller-provided store.
    Custom(Box<dyn WoundStore + Send + Sync>),
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory(s) => f.debug_tuple("InMemory").field(s).finish(),
            Self::Persistent(s) => f.debug_tuple("Persistent").field(s).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

/// What became of the evaluation that follows a treatment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationReport {
    /// The evaluator ran; see the write outcome for persistence.
    Completed { evaluation: Evaluation },
    /// The wound vanished before evaluation.
    WoundMissing,
    /// Evaluation aborted on a read failure.
    Failed { reason: String },
}

impl EvaluationReport {
    /// The evaluation, when one was produced.
    #[must_use]
    pub fn evaluation(&self) -> Option<&Evaluation> {
        match self {
            Self::Completed { evaluation } => Some(evaluation),
            Self::WoundMissing | Self::Failed { .. } => None,
        }
    }
}

impl From<Result<Option<Evaluation>, WoundcareError>> for EvaluationReport {
    fn from(result: Result<Option<Evaluation>, WoundcareError>) -> Self {
        match result {
            Ok(Some(evaluation)) => Self::Completed { evaluation },
            Ok(None) => Self::WoundMissing,
            Err(e) => Self::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// A committed treatment plus the evaluation it triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentRecorded {
    pub treatment: Treatment,
    pub evaluation: EvaluationReport,
}

/// Wound registry.
///
/// Does NOT implement Clone: the redb handle cannot be shared that way.
#[derive(Debug, Default)]
pub struct Registry {
    backend: StorageBackend,
    evaluator: StageEvaluator,
}

impl Registry {
    /// Create an empty in-memory registry with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open or create a persistent registry at `path`.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, WoundcareError> {
        Ok(Self {
            backend: StorageBackend::Persistent(RedbStore::open(path)?),
            evaluator: StageEvaluator::new(),
        })
    }

    /// Registry over any store implementation.
    #[must_use]
    pub fn with_store(store: impl WoundStore + Send + Sync + 'static) -> Self {
        Self {
            backend: StorageBackend::Custom(Box::new(store)),
            evaluator: StageEvaluator::new(),
        }
    }

    /// Replace the rule thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: StageThresholds) -> Self {
        self.evaluator = StageEvaluator::with_thresholds(thresholds);
        self
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn WoundStore {
        match &self.backend {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
            StorageBackend::Custom(s) => s.as_ref(),
        }
    }

    fn store_mut(&mut self) -> &mut dyn WoundStore {
        match &mut self.backend {
            StorageBackend::InMemory(s) => s,
            StorageBackend::Persistent(s) => s,
            StorageBackend::Custom(s) => s.as_mut(),
        }
    }

    fn require(&self, id: WoundId) -> Result<Wound, WoundcareError> {
        self.store()
            .get_wound(id)?
            .ok_or(WoundcareError::WoundNotFound(id))
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Register a new wound in `valoracion_inicial`.
    pub fn register_wound(
        &mut self,
        new: NewWound,
        now: DateTime<Utc>,
    ) -> Result<Wound, WoundcareError> {
        self.store_mut().insert_wound(new, now)
    }

    /// Record a treatment, then re-evaluate the wound's stage.
    ///
    /// Fails only if the treatment itself cannot be committed.
    pub fn record_treatment(
        &mut self,
        wound_id: WoundId,
        new: NewTreatment,
        now: DateTime<Utc>,
    ) -> Result<TreatmentRecorded, WoundcareError> {
        let treatment = self.store_mut().insert_treatment(wound_id, new, now)?;
        let evaluation = self.evaluate(wound_id, now).into();
        Ok(TreatmentRecorded {
            treatment,
            evaluation,
        })
    }

    /// Edit clinical attributes or descriptive fields. Does not evaluate.
    pub fn update_attributes(
        &mut self,
        wound_id: WoundId,
        patch: WoundPatch,
        now: DateTime<Utc>,
    ) -> Result<Wound, WoundcareError> {
        let mut wound = self.require(wound_id)?;
        if patch.is_empty() {
            return Ok(wound);
        }
        wound.apply_patch(patch, now);
        self.store_mut().replace_wound(&wound)?;
        Ok(wound)
    }

    /// Set the stage by hand, bypassing the rules.
    pub fn override_stage(
        &mut self,
        wound_id: WoundId,
        stage: ClinicalStage,
        now: DateTime<Utc>,
    ) -> Result<Wound, WoundcareError> {
        let mut wound = self.require(wound_id)?;
        wound.clinical_stage = stage;
        wound.updated_at = now;
        self.store_mut().replace_wound(&wound)?;
        Ok(wound)
    }

    /// Run the stage evaluator on one wound.
    pub fn evaluate(
        &mut self,
        wound_id: WoundId,
        now: DateTime<Utc>,
    ) -> Result<Option<Evaluation>, WoundcareError> {
        match &mut self.backend {
            StorageBackend::InMemory(s) => self.evaluator.evaluate(s, wound_id, now),
            StorageBackend::Persistent(s) => self.evaluator.evaluate(s, wound_id, now),
            StorageBackend::Custom(s) => self.evaluator.evaluate(s.as_mut(), wound_id, now),
        }
    }

    /// Delete a wound and its treatments. Returns false if absent.
    pub fn delete_wound(&mut self, wound_id: WoundId) -> Result<bool, WoundcareError> {
        self.store_mut().delete_wound(wound_id)
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn wound(&self, wound_id: WoundId) -> Result<Option<Wound>, WoundcareError> {
        self.store().get_wound(wound_id)
    }

    /// Treatments of an existing wound, most-recent-first.
    pub fn treatments(&self, wound_id: WoundId) -> Result<Vec<Treatment>, WoundcareError> {
        self.require(wound_id)?;
        self.store().list_treatments_by_wound(wound_id)
    }

    pub fn wounds_for_patient(&self, patient: PatientId) -> Result<Vec<Wound>, WoundcareError> {
        self.store().wounds_for_patient(patient)
    }

    pub fn list_wounds(&self) -> Result<Vec<Wound>, WoundcareError> {
        self.store().list_wounds()
    }

    /// Wound counts per stage.
    pub fn summary(&self) -> Result<StageSummary, WoundcareError> {
        let wounds = self.store().list_wounds()?;
        Ok(StageSummary::from_wounds(&wounds))
    }
}

// =============================================================================
// TESTS
// =============================================================================
