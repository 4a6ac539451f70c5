//! # Stage Scenario Tests
//!
//! End-to-end evaluation scenarios, driven through the [`Registry`] and
//! the [`StageEvaluator`] against both storage backends.
//!
//! ## Groups
//! - Cascade: each rule reached through the public API
//! - Priority: earlier rules shadow later ones
//! - Persistence: writes, idempotence, conflicts

use chrono::{DateTime, Duration, TimeZone, Utc};
use woundcare_core::{
    Centimeters, ClinicalAttributes, ClinicalStage, Exudate, InfectionSigns, MemoryStore,
    NewTreatment, NewWound, PainScale, PatientId, RedbStore, Registry, StageEvaluator, StageRule,
    StageWrite, WoundId, WoundStore, WriteOutcome,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0)
        .single()
        .expect("valid date")
}

fn cm(hundredths: u32) -> Option<Centimeters> {
    Some(Centimeters::from_hundredths(hundredths))
}

/// Store a wound created at `t0()` with `count` treatments spread one hour apart.
fn seed<S: WoundStore>(store: &mut S, attrs: ClinicalAttributes, count: i64) -> WoundId {
    let wound = store
        .insert_wound(
            NewWound::for_patient(PatientId(7)).with_attributes(attrs),
            t0(),
        )
        .expect("insert");
    for h in 0..count {
        store
            .insert_treatment(wound.id, NewTreatment::default(), t0() + Duration::hours(h))
            .expect("treat");
    }
    wound.id
}

// =============================================================================
// CASCADE
// =============================================================================

mod cascade {
    use super::*;

    #[test]
    fn fresh_wound_stays_in_initial_assessment_without_write() {
        let mut store = MemoryStore::new();
        let id = seed(&mut store, ClinicalAttributes::default(), 0);

        let eval = StageEvaluator::new()
            .evaluate(&mut store, id, t0() + Duration::minutes(5))
            .expect("evaluate")
            .expect("present");

        assert_eq!(eval.stage, ClinicalStage::ValoracionInicial);
        assert_eq!(eval.rule, Some(StageRule::InitialAssessment));
        assert_eq!(eval.write, WriteOutcome::Unchanged);
    }

    #[test]
    fn two_treatments_without_signs_is_in_progress() {
        let mut store = MemoryStore::new();
        let id = seed(&mut store, ClinicalAttributes::default(), 2);

        let eval = StageEvaluator::new()
            .evaluate(&mut store, id, t0() + Duration::hours(3))
            .expect("evaluate")
            .expect("present");

        assert_eq!(eval.stage, ClinicalStage::TratamientoEnCurso);
        assert_eq!(eval.previous, ClinicalStage::ValoracionInicial);
        assert_eq!(eval.write, WriteOutcome::Persisted);
    }

    #[test]
    fn severe_pain_is_under_observation_outside_early_treatment() {
        let attrs = ClinicalAttributes {
            pain_scale: PainScale::new(9),
            ..ClinicalAttributes::default()
        };
        for count in [0, 4, 7] {
            let mut store = MemoryStore::new();
            let id = seed(&mut store, attrs.clone(), count);
            let eval = StageEvaluator::new()
                .evaluate(&mut store, id, t0() + Duration::days(2))
                .expect("evaluate")
                .expect("present");
            assert_eq!(eval.stage, ClinicalStage::BajoObservacion, "count {count}");
        }
    }

    #[test]
    fn severe_pain_during_early_treatment_stays_in_progress() {
        // Rule 2 only excludes infection, so it shadows the pain alert.
        let attrs = ClinicalAttributes {
            pain_scale: PainScale::new(9),
            ..ClinicalAttributes::default()
        };
        let mut store = MemoryStore::new();
        let id = seed(&mut store, attrs, 2);
        let eval = StageEvaluator::new()
            .evaluate(&mut store, id, t0() + Duration::days(2))
            .expect("evaluate")
            .expect("present");
        assert_eq!(eval.stage, ClinicalStage::TratamientoEnCurso);
    }

    #[test]
    fn small_dry_painless_wound_is_discharged() {
        let attrs = ClinicalAttributes {
            infection_signs: None,
            pain_scale: PainScale::new(1),
            exudate_amount: Some(Exudate::Escaso),
            length_cm: cm(50),
            width_cm: cm(50),
        };
        let mut store = MemoryStore::new();
        let id = seed(&mut store, attrs, 0);

        let eval = StageEvaluator::new()
            .evaluate(&mut store, id, t0() + Duration::days(3))
            .expect("evaluate")
            .expect("present");

        assert_eq!(eval.stage, ClinicalStage::AltaClinica);
        assert_eq!(eval.rule, Some(StageRule::ClinicalDischarge));
    }

    #[test]
    fn stalled_wound_with_heavy_exudate_is_under_observation() {
        let attrs = ClinicalAttributes {
            exudate_amount: Some(Exudate::Abundante),
            ..ClinicalAttributes::default()
        };
        let mut store = MemoryStore::new();
        let id = seed(&mut store, attrs, 6);

        let eval = StageEvaluator::new()
            .evaluate(&mut store, id, t0() + Duration::days(20))
            .expect("evaluate")
            .expect("present");

        assert_eq!(eval.stage, ClinicalStage::BajoObservacion);
        assert_eq!(eval.metrics.days_since_creation, 20);
        assert_eq!(eval.metrics.treatment_count, 6);
    }

    #[test]
    fn improving_wound_is_favorable() {
        let attrs = ClinicalAttributes {
            pain_scale: PainScale::new(3),
            exudate_amount: Some(Exudate::Moderado),
            ..ClinicalAttributes::default()
        };
        let mut store = MemoryStore::new();
        let id = seed(&mut store, attrs, 4);

        let eval = StageEvaluator::new()
            .evaluate(&mut store, id, t0() + Duration::days(5))
            .expect("evaluate")
            .expect("present");

        assert_eq!(eval.stage, ClinicalStage::EvolucionFavorable);
    }
}

// =============================================================================
// PRIORITY
// =============================================================================

mod priority {
    use super::*;

    #[test]
    fn infection_beats_discharge() {
        let attrs = ClinicalAttributes {
            infection_signs: Some(InfectionSigns::Present),
            pain_scale: PainScale::new(0),
            exudate_amount: Some(Exudate::Escaso),
            length_cm: cm(20),
            width_cm: cm(20),
        };
        let mut store = MemoryStore::new();
        let id = seed(&mut store, attrs, 0);

        let eval = StageEvaluator::new()
            .evaluate(&mut store, id, t0() + Duration::days(2))
            .expect("evaluate")
            .expect("present");

        assert_eq!(eval.stage, ClinicalStage::BajoObservacion);
    }

    #[test]
    fn unclear_infection_does_not_count() {
        let attrs = ClinicalAttributes {
            infection_signs: Some(InfectionSigns::Unclear("quizas".into())),
            ..ClinicalAttributes::default()
        };
        let mut store = MemoryStore::new();
        let id = seed(&mut store, attrs, 1);

        let eval = StageEvaluator::new()
            .evaluate(&mut store, id, t0() + Duration::hours(2))
            .expect("evaluate")
            .expect("present");

        assert_eq!(eval.stage, ClinicalStage::TratamientoEnCurso);
    }

    #[test]
    fn in_progress_shadows_discharge() {
        let attrs = ClinicalAttributes {
            infection_signs: Some(InfectionSigns::Absent),
            pain_scale: PainScale::new(0),
            exudate_amount: Some(Exudate::Escaso),
            length_cm: cm(10),
            width_cm: cm(10),
        };
        let mut store = MemoryStore::new();
        let id = seed(&mut store, attrs, 3);

        let eval = StageEvaluator::new()
            .evaluate(&mut store, id, t0() + Duration::days(1))
            .expect("evaluate")
            .expect("present");

        assert_eq!(eval.rule, Some(StageRule::InProgress));
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

mod persistence {
    use super::*;

    #[test]
    fn registry_walks_a_wound_through_stages() {
        let mut reg = Registry::new();
        let attrs = ClinicalAttributes {
            pain_scale: PainScale::new(2),
            exudate_amount: Some(Exudate::Escaso),
            ..ClinicalAttributes::default()
        };
        let w = reg
            .register_wound(
                NewWound::for_patient(PatientId(1)).with_attributes(attrs),
                t0(),
            )
            .expect("register");

        let mut stages = Vec::new();
        for day in 1..=4 {
            let recorded = reg
                .record_treatment(w.id, NewTreatment::default(), t0() + Duration::days(day))
                .expect("treat");
            let eval = recorded.evaluation.evaluation().expect("evaluated");
            stages.push(eval.stage);
        }

        assert_eq!(
            stages,
            vec![
                ClinicalStage::TratamientoEnCurso,
                ClinicalStage::TratamientoEnCurso,
                ClinicalStage::TratamientoEnCurso,
                ClinicalStage::EvolucionFavorable,
            ]
        );
    }

    #[test]
    fn evaluation_is_idempotent_on_redb() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let mut store = RedbStore::open(dir.path().join("scenarios.redb")).expect("open");
        let id = seed(&mut store, ClinicalAttributes::default(), 2);
        let evaluator = StageEvaluator::new();
        let now = t0() + Duration::hours(5);

        let first = evaluator
            .evaluate(&mut store, id, now)
            .expect("evaluate")
            .expect("present");
        assert_eq!(first.write, WriteOutcome::Persisted);

        let second = evaluator
            .evaluate(&mut store, id, now)
            .expect("evaluate")
            .expect("present");
        assert_eq!(second.write, WriteOutcome::Unchanged);
        assert_eq!(second.stage, first.stage);
    }

    #[test]
    fn concurrent_override_is_not_clobbered() {
        let mut store = MemoryStore::new();
        let id = seed(&mut store, ClinicalAttributes::default(), 1);

        // A manual override lands between the evaluator's read and write.
        let write = store
            .set_stage_if(
                id,
                ClinicalStage::ValoracionInicial,
                ClinicalStage::AltaClinica,
                t0(),
            )
            .expect("override");
        assert_eq!(write, StageWrite::Applied);
        let write = store
            .set_stage_if(
                id,
                ClinicalStage::ValoracionInicial,
                ClinicalStage::TratamientoEnCurso,
                t0(),
            )
            .expect("stale write");
        assert_eq!(
            write,
            StageWrite::Conflict {
                current: ClinicalStage::AltaClinica
            }
        );

        let stored = store.get_wound(id).expect("get").expect("present");
        assert_eq!(stored.clinical_stage, ClinicalStage::AltaClinica);
    }

    #[test]
    fn deleted_wound_evaluates_to_none() {
        let mut reg = Registry::new();
        let w = reg
            .register_wound(NewWound::for_patient(PatientId(1)), t0())
            .expect("register");
        assert!(reg.delete_wound(w.id).expect("delete"));
        assert!(reg.evaluate(w.id, t0()).expect("evaluate").is_none());
    }
}
