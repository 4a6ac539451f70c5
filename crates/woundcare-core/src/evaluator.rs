//! # Stage Evaluator
//!
//! Runs the stage cascade against the stored state of one wound and
//! persists a transition when the computed stage differs from the stored
//! one.
//!
//! The evaluator owns no state besides its thresholds. The store is
//! passed in on every call so any [`WoundStore`] (or a test double) can
//! be used.
//!
//! Failure semantics:
//! - missing wound: `Ok(None)`, nothing written
//! - failed read: `Err(ReadFailure)`, nothing written
//! - failed write: `Ok(Some(..))` with [`WriteOutcome::Failed`]

use crate::store::{StageWrite, WoundStore};
use crate::system::{ClinicalStage, StageAssessor, StageRule, StageThresholds, WoundMetrics};
use crate::{WoundId, WoundcareError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to the computed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum WriteOutcome {
    /// The stored stage already matched; no write was issued.
    Unchanged,
    /// The new stage was written.
    Persisted,
    /// Another writer changed the stage first; nothing was written.
    Conflict(ClinicalStage),
    /// The wound disappeared between read and write.
    Missing,
    /// The write failed; the stage is only intended.
    Failed(String),
}

/// Result of evaluating one wound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub wound_id: WoundId,
    /// Stage stored before evaluation.
    pub previous: ClinicalStage,
    /// Stage computed by the cascade.
    pub stage: ClinicalStage,
    pub rule: Option<StageRule>,
    pub metrics: WoundMetrics,
    pub write: WriteOutcome,
}

impl Evaluation {
    /// True when the stored stage equals the computed one after this call.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self.write, WriteOutcome::Unchanged | WriteOutcome::Persisted)
    }

    /// True when the computed stage differs from the previous one.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.previous != self.stage
    }
}

/// Evaluates and persists clinical stages.
#[derive(Debug, Clone, Default)]
pub struct StageEvaluator {
    assessor: StageAssessor,
}

impl StageEvaluator {
    /// Create an evaluator with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_thresholds(thresholds: StageThresholds) -> Self {
        Self {
            assessor: StageAssessor::with_thresholds(thresholds),
        }
    }

    /// Evaluate wound `id` as of `now`.
    ///
    /// At most one stage write is issued, conditioned on the stage read at
    /// the start of the call.
    pub fn evaluate<S: WoundStore + ?Sized>(
        &self,
        store: &mut S,
        id: WoundId,
        now: DateTime<Utc>,
    ) -> Result<Option<Evaluation>, WoundcareError> {
        let wound = match store.get_wound(id).map_err(read_failure)? {
            Some(w) => w,
            None => return Ok(None),
        };
        let treatments = store.list_treatments_by_wound(id).map_err(read_failure)?;

        let assessment = self.assessor.assess(&wound, &treatments, now);
        let previous = wound.clinical_stage;

        let write = if assessment.stage == previous {
            WriteOutcome::Unchanged
        } else {
            match store.set_stage_if(id, previous, assessment.stage, now) {
                Ok(StageWrite::Applied) => WriteOutcome::Persisted,
                Ok(StageWrite::Conflict { current }) => WriteOutcome::Conflict(current),
                Ok(StageWrite::Missing) => WriteOutcome::Missing,
                Err(e) => WriteOutcome::Failed(e.to_string()),
            }
        };

        Ok(Some(Evaluation {
            wound_id: id,
            previous,
            stage: assessment.stage,
            rule: assessment.rule,
            metrics: assessment.metrics,
            write,
        }))
    }
}

fn read_failure(e: WoundcareError) -> WoundcareError {
    match e {
        WoundcareError::ReadFailure(_) => e,
        other => WoundcareError::ReadFailure(other.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================
