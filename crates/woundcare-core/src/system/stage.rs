//! # Clinical Stage Assessment
//!
//! Derives the clinical stage a wound should be in from its current
//! attributes and its treatment history.
//!
//! ## Rule Cascade
//!
//! Rules are evaluated top-to-bottom and the first match wins. When no
//! rule matches, the stored stage is kept.
//!
//! | # | Rule | Condition | Stage |
//! |---|------|-----------|-------|
//! | 1 | Initial assessment | no treatments, younger than one day | `valoracion_inicial` |
//! | 2 | In progress | 1..=3 treatments, no infection | `tratamiento_en_curso` |
//! | 3 | Under observation | infection, pain > 7, or stalled wound | `bajo_observacion` |
//! | 4 | Favorable evolution | > 3 treatments, no infection, pain <= 5, improving | `evolucion_favorable` |
//! | 5 | Clinical discharge | both sides < 1 cm, scarce exudate, pain <= 2, no infection | `alta_clinica` |
//!
//! ## Important Note
//!
//! "Improvement" judges the current snapshot against absolute thresholds.
//! No per-treatment measurement series exists to compute a real trend.

use crate::primitives::{
    ALERT_PAIN_ABOVE, DISCHARGE_PAIN_MAX, DISCHARGE_SIZE_BELOW, FAVORABLE_MIN_TREATMENTS,
    FAVORABLE_PAIN_MAX, IMPROVEMENT_MIN_TREATMENTS, IMPROVEMENT_PAIN_MAX, IMPROVEMENT_SIZE_BELOW,
    IN_PROGRESS_MAX_TREATMENTS, SECONDS_PER_DAY, STALLED_MIN_DAYS, STALLED_MIN_TREATMENTS,
    STALLED_PAIN_ABOVE, STALLED_SIZE_ABOVE,
};
use crate::{Centimeters, ClinicalAttributes, Exudate, Treatment, Wound, WoundcareError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

// =============================================================================
// STAGE ENUM
// =============================================================================

/// Lifecycle stage summarizing a wound's care trajectory.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalStage {
    #[default]
    ValoracionInicial,
    TratamientoEnCurso,
    BajoObservacion,
    EvolucionFavorable,
    AltaClinica,
}

impl ClinicalStage {
    /// All stages in declaration order.
    pub const ALL: [ClinicalStage; 5] = [
        ClinicalStage::ValoracionInicial,
        ClinicalStage::TratamientoEnCurso,
        ClinicalStage::BajoObservacion,
        ClinicalStage::EvolucionFavorable,
        ClinicalStage::AltaClinica,
    ];

    /// Wire name (snake_case).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ClinicalStage::ValoracionInicial => "valoracion_inicial",
            ClinicalStage::TratamientoEnCurso => "tratamiento_en_curso",
            ClinicalStage::BajoObservacion => "bajo_observacion",
            ClinicalStage::EvolucionFavorable => "evolucion_favorable",
            ClinicalStage::AltaClinica => "alta_clinica",
        }
    }

    /// Label shown to clinicians.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ClinicalStage::ValoracionInicial => "Valoración inicial",
            ClinicalStage::TratamientoEnCurso => "Tratamiento en curso",
            ClinicalStage::BajoObservacion => "Bajo observación",
            ClinicalStage::EvolucionFavorable => "Evolución favorable",
            ClinicalStage::AltaClinica => "Alta clínica",
        }
    }

    /// The stage that flags a wound for closer follow-up.
    #[must_use]
    pub fn is_alert(&self) -> bool {
        matches!(self, ClinicalStage::BajoObservacion)
    }

    /// Discharge is only ever a suggestion; it is still the last stage.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClinicalStage::AltaClinica)
    }
}

impl std::fmt::Display for ClinicalStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClinicalStage {
    type Err = WoundcareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ClinicalStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                WoundcareError::invalid("clinical_stage", format!("unknown stage '{}'", wanted))
            })
    }
}

// =============================================================================
// STAGE RULES
// =============================================================================

/// The rules of the cascade, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRule {
    InitialAssessment,
    InProgress,
    UnderObservation,
    FavorableEvolution,
    ClinicalDischarge,
}

impl StageRule {
    /// Evaluation order. The first matching rule wins.
    pub const CASCADE: [StageRule; 5] = [
        StageRule::InitialAssessment,
        StageRule::InProgress,
        StageRule::UnderObservation,
        StageRule::FavorableEvolution,
        StageRule::ClinicalDischarge,
    ];

    /// Stage produced when this rule matches.
    #[must_use]
    pub fn stage(&self) -> ClinicalStage {
        match self {
            StageRule::InitialAssessment => ClinicalStage::ValoracionInicial,
            StageRule::InProgress => ClinicalStage::TratamientoEnCurso,
            StageRule::UnderObservation => ClinicalStage::BajoObservacion,
            StageRule::FavorableEvolution => ClinicalStage::EvolucionFavorable,
            StageRule::ClinicalDischarge => ClinicalStage::AltaClinica,
        }
    }

    /// Rule name for logs and reports.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            StageRule::InitialAssessment => "initial_assessment",
            StageRule::InProgress => "in_progress",
            StageRule::UnderObservation => "under_observation",
            StageRule::FavorableEvolution => "favorable_evolution",
            StageRule::ClinicalDischarge => "clinical_discharge",
        }
    }
}

impl std::fmt::Display for StageRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// THRESHOLDS
// =============================================================================

/// Every numeric constant the cascade compares against.
///
/// Strictness of each comparison is fixed by the rules; only the values
/// are configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageThresholds {
    pub in_progress_max_treatments: usize,
    pub alert_pain_above: u8,
    pub stalled_min_days: i64,
    pub stalled_min_treatments: usize,
    pub stalled_pain_above: u8,
    pub stalled_size_above: Centimeters,
    pub favorable_min_treatments: usize,
    pub favorable_pain_max: u8,
    pub improvement_min_treatments: usize,
    pub improvement_pain_max: u8,
    pub improvement_size_below: Centimeters,
    pub discharge_size_below: Centimeters,
    pub discharge_pain_max: u8,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            in_progress_max_treatments: IN_PROGRESS_MAX_TREATMENTS,
            alert_pain_above: ALERT_PAIN_ABOVE,
            stalled_min_days: STALLED_MIN_DAYS,
            stalled_min_treatments: STALLED_MIN_TREATMENTS,
            stalled_pain_above: STALLED_PAIN_ABOVE,
            stalled_size_above: STALLED_SIZE_ABOVE,
            favorable_min_treatments: FAVORABLE_MIN_TREATMENTS,
            favorable_pain_max: FAVORABLE_PAIN_MAX,
            improvement_min_treatments: IMPROVEMENT_MIN_TREATMENTS,
            improvement_pain_max: IMPROVEMENT_PAIN_MAX,
            improvement_size_below: IMPROVEMENT_SIZE_BELOW,
            discharge_size_below: DISCHARGE_SIZE_BELOW,
            discharge_pain_max: DISCHARGE_PAIN_MAX,
        }
    }
}

// =============================================================================
// WOUND METRICS
// =============================================================================

/// Quantities derived from a wound and its treatment history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WoundMetrics {
    /// Number of recorded treatments.
    pub treatment_count: usize,
    /// Whole elapsed days since registration (floor of elapsed / 24h).
    pub days_since_creation: i64,
    /// Timestamp of the most recent treatment, if any.
    pub last_treatment_at: Option<DateTime<Utc>>,
}

impl WoundMetrics {
    /// Compute metrics. `treatments` must be most-recent-first.
    #[must_use]
    pub fn collect(wound: &Wound, treatments: &[Treatment], now: DateTime<Utc>) -> Self {
        Self {
            treatment_count: treatments.len(),
            days_since_creation: elapsed_days(wound.created_at, now),
            last_treatment_at: treatments.first().map(|t| t.created_at),
        }
    }
}

/// Floor of the elapsed time in days. Negative when `now` precedes `since`.
#[must_use]
pub fn elapsed_days(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(since)
        .num_seconds()
        .div_euclid(SECONDS_PER_DAY)
}

// =============================================================================
// STAGE ASSESSOR
// =============================================================================

/// Outcome of running the cascade over one wound snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageAssessment {
    /// Stage the wound should be in.
    pub stage: ClinicalStage,
    /// Rule that decided it; `None` keeps the stored stage.
    pub rule: Option<StageRule>,
    pub metrics: WoundMetrics,
}

/// Stage Assessor - Pure function to determine the should-be stage.
#[derive(Debug, Clone, Default)]
pub struct StageAssessor {
    thresholds: StageThresholds,
}

impl StageAssessor {
    /// Create a new assessor with default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an assessor with custom thresholds.
    #[must_use]
    pub fn with_thresholds(thresholds: StageThresholds) -> Self {
        Self { thresholds }
    }

    /// Assess a wound. `treatments` must be most-recent-first.
    #[must_use]
    pub fn assess(
        &self,
        wound: &Wound,
        treatments: &[Treatment],
        now: DateTime<Utc>,
    ) -> StageAssessment {
        let metrics = WoundMetrics::collect(wound, treatments, now);
        self.assess_from_metrics(wound, metrics)
    }

    /// Assess from pre-computed metrics.
    #[must_use]
    pub fn assess_from_metrics(&self, wound: &Wound, metrics: WoundMetrics) -> StageAssessment {
        let rule = self.matching_rule(&wound.attributes, &metrics);
        StageAssessment {
            stage: rule.map_or(wound.clinical_stage, |r| r.stage()),
            rule,
            metrics,
        }
    }

    /// First rule of the cascade that matches, if any.
    #[must_use]
    pub fn matching_rule(
        &self,
        attrs: &ClinicalAttributes,
        metrics: &WoundMetrics,
    ) -> Option<StageRule> {
        StageRule::CASCADE
            .into_iter()
            .find(|rule| self.rule_matches(*rule, attrs, metrics))
    }

    /// Check a single rule in isolation (ignores priority).
    #[must_use]
    pub fn rule_matches(
        &self,
        rule: StageRule,
        attrs: &ClinicalAttributes,
        metrics: &WoundMetrics,
    ) -> bool {
        let t = &self.thresholds;
        let count = metrics.treatment_count;
        let infected = attrs.has_infection_signs();

        match rule {
            StageRule::InitialAssessment => count == 0 && metrics.days_since_creation < 1,

            StageRule::InProgress => {
                (1..=t.in_progress_max_treatments).contains(&count) && !infected
            }

            StageRule::UnderObservation => {
                infected
                    || attrs.pain_above(t.alert_pain_above)
                    || (metrics.days_since_creation > t.stalled_min_days
                        && count > t.stalled_min_treatments
                        && self.no_improvement(attrs))
            }

            StageRule::FavorableEvolution => {
                count > t.favorable_min_treatments
                    && !infected
                    && attrs.pain_at_most_or_unset(t.favorable_pain_max)
                    && self.shows_improvement(attrs, count)
            }

            StageRule::ClinicalDischarge => {
                attrs.both_dimensions_below(t.discharge_size_below)
                    && attrs.exudate_is(&Exudate::Escaso)
                    && attrs.pain_at_most_or_unset(t.discharge_pain_max)
                    && !infected
            }
        }
    }

    /// The wound is not getting better: heavy exudate, high pain, or large.
    #[must_use]
    pub fn no_improvement(&self, attrs: &ClinicalAttributes) -> bool {
        let t = &self.thresholds;
        attrs.exudate_is(&Exudate::Abundante)
            || attrs.pain_above(t.stalled_pain_above)
            || attrs.any_dimension_above(t.stalled_size_above)
    }

    /// The wound looks better: needs enough treatments, then any of low
    /// exudate, low pain, or small size.
    #[must_use]
    pub fn shows_improvement(&self, attrs: &ClinicalAttributes, treatment_count: usize) -> bool {
        let t = &self.thresholds;
        if treatment_count < t.improvement_min_treatments {
            return false;
        }

        let low_exudate = matches!(
            attrs.exudate_amount,
            Some(Exudate::Escaso | Exudate::Moderado)
        );
        let low_pain = attrs
            .pain_scale
            .is_some_and(|p| p.value() <= t.improvement_pain_max);
        let small = attrs.both_dimensions_below(t.improvement_size_below);

        low_exudate || low_pain || small
    }
}

// =============================================================================
// STAGE SUMMARY
// =============================================================================

/// Count of wounds per stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageSummary {
    pub total: usize,
    pub per_stage: BTreeMap<ClinicalStage, usize>,
}

impl StageSummary {
    /// Tally the stages of the given wounds. Every stage gets an entry.
    #[must_use]
    pub fn from_wounds<'a>(wounds: impl IntoIterator<Item = &'a Wound>) -> Self {
        let mut per_stage: BTreeMap<ClinicalStage, usize> =
            ClinicalStage::ALL.into_iter().map(|s| (s, 0)).collect();
        let mut total = 0usize;
        for wound in wounds {
            total = total.saturating_add(1);
            let slot = per_stage.entry(wound.clinical_stage).or_insert(0);
            *slot = slot.saturating_add(1);
        }
        Self { total, per_stage }
    }

    /// Number of wounds in `stage`.
    #[must_use]
    pub fn count(&self, stage: ClinicalStage) -> usize {
        self.per_stage.get(&stage).copied().unwrap_or(0)
    }
}

// =============================================================================
// TESTS
// =============================================================================
