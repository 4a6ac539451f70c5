//! # Clinical Primitives
//!
//! Hardcoded constants for the woundcare core.
//!
//! The default stage thresholds live here so that the rule cascade,
//! the configuration layer and the tests all agree on one set of values.
//! [`crate::system::StageThresholds`] copies them at construction.

use crate::Centimeters;

/// Seconds in one elapsed day. Day counts are pure duration arithmetic,
/// not calendar-aware.
pub const SECONDS_PER_DAY: i64 = 86_400;

// =============================================================================
// STAGE RULE DEFAULTS
// =============================================================================

/// Rule 2: at most this many treatments keeps a wound "in progress".
pub const IN_PROGRESS_MAX_TREATMENTS: usize = 3;

/// Rule 3: pain strictly above this raises an alert.
pub const ALERT_PAIN_ABOVE: u8 = 7;

/// Rule 3: a stalled wound is older than this many days...
pub const STALLED_MIN_DAYS: i64 = 14;

/// ...and has more than this many treatments.
pub const STALLED_MIN_TREATMENTS: usize = 5;

/// No-improvement: pain strictly above this.
pub const STALLED_PAIN_ABOVE: u8 = 6;

/// No-improvement: either dimension strictly above this.
pub const STALLED_SIZE_ABOVE: Centimeters = Centimeters::from_whole(8);

/// Rule 4: favorable evolution needs more than this many treatments.
pub const FAVORABLE_MIN_TREATMENTS: usize = 3;

/// Rule 4: pain at most this (or unset).
pub const FAVORABLE_PAIN_MAX: u8 = 5;

/// Improvement: at least this many treatments must be recorded.
pub const IMPROVEMENT_MIN_TREATMENTS: usize = 2;

/// Improvement: pain at most this.
pub const IMPROVEMENT_PAIN_MAX: u8 = 4;

/// Improvement: both dimensions strictly below this.
pub const IMPROVEMENT_SIZE_BELOW: Centimeters = Centimeters::from_whole(5);

/// Rule 5: both dimensions strictly below this.
pub const DISCHARGE_SIZE_BELOW: Centimeters = Centimeters::from_whole(1);

/// Rule 5: pain at most this (or unset).
pub const DISCHARGE_PAIN_MAX: u8 = 2;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Largest accepted wound dimension.
///
/// Values above this are rejected at ingestion as data-entry errors.
pub const MAX_MEASUREMENT: Centimeters = Centimeters::from_whole(500);

/// Maximum fractional digits accepted for a measurement.
pub const MEASUREMENT_DECIMALS: usize = 2;

/// Maximum length for short text fields (location, type, performer).
pub const MAX_LABEL_LENGTH: usize = 256;

/// Maximum length for long text fields (description, treatment notes).
pub const MAX_NOTE_LENGTH: usize = 8192;
