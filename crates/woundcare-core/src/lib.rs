//! # woundcare-core
//!
//! The deterministic clinical-stage engine for woundcare - THE RULES.
//!
//! Clinicians register wounds and record treatments ("curaciones"). After
//! each treatment the engine inspects the wound's clinical attributes and
//! its treatment history, derives the clinical stage from a fixed rule
//! cascade, and persists a transition when the stage changed.
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - Never reads the clock: every operation takes `now` from the caller
//! - Integer arithmetic only; measurements are fixed-point hundredths
//! - Persistence is reached only through [`WoundStore`]

// =============================================================================
// MODULES
// =============================================================================

pub mod evaluator;
pub mod normalize;
pub mod primitives;
pub mod registry;
pub mod storage;
pub mod store;
pub mod system;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Centimeters, ClinicalAttributes, Exudate, InfectionSigns, NewTreatment, NewWound, PainScale,
    PatientId, Treatment, TreatmentId, Wound, WoundId, WoundPatch, WoundcareError,
    sort_most_recent_first,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use evaluator::{Evaluation, StageEvaluator, WriteOutcome};
pub use normalize::{RawField, RawTreatment, RawWound, RawWoundPatch};
pub use registry::{EvaluationReport, Registry, StorageBackend, TreatmentRecorded};
pub use storage::RedbStore;
pub use store::{MemoryStore, StageWrite, WoundStore};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::{
    ClinicalStage, StageAssessment, StageAssessor, StageRule, StageSummary, StageThresholds,
    WoundMetrics, elapsed_days,
};
