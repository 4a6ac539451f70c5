//! # Property-Based Tests
//!
//! Determinism and cascade invariants checked with proptest.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use woundcare_core::{
    Centimeters, ClinicalAttributes, ClinicalStage, Exudate, InfectionSigns, MemoryStore,
    NewTreatment, NewWound, PainScale, PatientId, RawField, StageAssessor, StageEvaluator,
    WoundMetrics, WoundStore, WriteOutcome, normalize,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
        .single()
        .expect("valid date")
}

fn arb_exudate() -> impl Strategy<Value = Option<Exudate>> {
    prop_oneof![
        Just(None),
        Just(Some(Exudate::Escaso)),
        Just(Some(Exudate::Moderado)),
        Just(Some(Exudate::Abundante)),
        Just(Some(Exudate::Other("seroso".into()))),
    ]
}

fn arb_infection() -> impl Strategy<Value = Option<InfectionSigns>> {
    prop_oneof![
        Just(None),
        Just(Some(InfectionSigns::Present)),
        Just(Some(InfectionSigns::Absent)),
        Just(Some(InfectionSigns::Unclear("tal vez".into()))),
    ]
}

fn arb_size() -> impl Strategy<Value = Option<Centimeters>> {
    proptest::option::of((0u32..2000).prop_map(Centimeters::from_hundredths))
}

prop_compose! {
    fn arb_attributes()(
        infection_signs in arb_infection(),
        pain in proptest::option::of(0u8..=10),
        exudate_amount in arb_exudate(),
        length_cm in arb_size(),
        width_cm in arb_size(),
    ) -> ClinicalAttributes {
        ClinicalAttributes {
            infection_signs,
            pain_scale: pain.and_then(PainScale::new),
            exudate_amount,
            length_cm,
            width_cm,
        }
    }
}

fn metrics(treatment_count: usize, days_since_creation: i64) -> WoundMetrics {
    WoundMetrics {
        treatment_count,
        days_since_creation,
        last_treatment_at: None,
    }
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Same snapshot, same history, same instant: same assessment.
    #[test]
    fn assessment_is_deterministic(
        attrs in arb_attributes(),
        count in 0usize..12,
        days in 0i64..40,
    ) {
        let mut store = MemoryStore::new();
        let wound = store
            .insert_wound(NewWound::for_patient(PatientId(1)).with_attributes(attrs), t0())
            .expect("insert");
        let assessor = StageAssessor::new();

        let a = assessor.assess_from_metrics(&wound, metrics(count, days));
        let b = assessor.assess_from_metrics(&wound, metrics(count, days));
        prop_assert_eq!(a, b);
    }

    /// Confirmed infection always lands in observation.
    #[test]
    fn infection_always_under_observation(
        attrs in arb_attributes(),
        count in 0usize..12,
        days in 1i64..40,
    ) {
        let attrs = ClinicalAttributes {
            infection_signs: Some(InfectionSigns::Present),
            ..attrs
        };
        let mut store = MemoryStore::new();
        let wound = store
            .insert_wound(NewWound::for_patient(PatientId(1)).with_attributes(attrs), t0())
            .expect("insert");

        let assessment = StageAssessor::new().assess_from_metrics(&wound, metrics(count, days));
        prop_assert_eq!(assessment.stage, ClinicalStage::BajoObservacion);
    }

    /// One to three treatments without infection is always in progress.
    #[test]
    fn early_treatments_are_in_progress(
        attrs in arb_attributes(),
        count in 1usize..=3,
        days in 0i64..40,
    ) {
        prop_assume!(!attrs.has_infection_signs());
        let mut store = MemoryStore::new();
        let wound = store
            .insert_wound(NewWound::for_patient(PatientId(1)).with_attributes(attrs), t0())
            .expect("insert");

        let assessment = StageAssessor::new().assess_from_metrics(&wound, metrics(count, days));
        prop_assert_eq!(assessment.stage, ClinicalStage::TratamientoEnCurso);
    }

    /// A second evaluation at the same instant never writes.
    #[test]
    fn evaluation_is_idempotent(
        attrs in arb_attributes(),
        count in 0i64..10,
        hours in 0i64..800,
    ) {
        let mut store = MemoryStore::new();
        let wound = store
            .insert_wound(NewWound::for_patient(PatientId(1)).with_attributes(attrs), t0())
            .expect("insert");
        for h in 0..count {
            store
                .insert_treatment(wound.id, NewTreatment::default(), t0() + Duration::minutes(h))
                .expect("treat");
        }
        let now = t0() + Duration::hours(hours);
        let evaluator = StageEvaluator::new();

        let first = evaluator.evaluate(&mut store, wound.id, now).expect("first").expect("present");
        let second = evaluator.evaluate(&mut store, wound.id, now).expect("second").expect("present");

        prop_assert_eq!(second.write, WriteOutcome::Unchanged);
        prop_assert_eq!(first.stage, second.stage);
    }

    /// Elapsed days never round up.
    #[test]
    fn elapsed_days_floors(seconds in 0i64..10_000_000) {
        let days = woundcare_core::elapsed_days(t0(), t0() + Duration::seconds(seconds));
        prop_assert!(days * 86_400 <= seconds);
        prop_assert!((days + 1) * 86_400 > seconds);
    }

    /// Two-decimal measurements survive normalization exactly.
    #[test]
    fn measurement_text_is_exact(whole in 0u32..500, frac in 0u32..100) {
        let text = format!("{whole}.{frac:02}");
        let parsed = normalize::measurement("length_cm", Some(&RawField::Text(text)))
            .expect("valid")
            .expect("present");
        prop_assert_eq!(parsed.hundredths(), whole * 100 + frac);
    }
}
