/// Property-based tests for classification, aggregation and persistence.
use chrono::{TimeZone, Utc};
use nutri_tracker::RecordStore;
use nutri_tracker::classifier::{classify, compute_bmi};
use nutri_tracker::models::{ChildRecord, StatusKey};
use nutri_tracker::stats::{aggregate_global, group_by_barangay};
use proptest::prelude::*;

fn status_strategy() -> impl Strategy<Value = StatusKey> {
    prop_oneof![
        Just(StatusKey::Underweight),
        Just(StatusKey::Normal),
        Just(StatusKey::Overweight),
        Just(StatusKey::Obese),
        Just(StatusKey::Unknown),
    ]
}

fn record_strategy() -> impl Strategy<Value = ChildRecord> {
    (
        "[a-z0-9]{1,12}",
        "[A-Za-z ]{0,12}",
        prop_oneof![Just("Centro"), Just("centro "), Just("Poblacion"), Just("San Roque"), Just("")],
        proptest::option::of(1u32..=1500u32),
        status_strategy(),
        0i64..4_000_000_000_000i64,
    )
        .prop_map(|(id, name, barangay, tenths, status, millis)| ChildRecord {
            id,
            name,
            barangay: barangay.to_string(),
            age: tenths.map(|t| f64::from(t % 20)),
            weight_kg: tenths.map(|t| f64::from(t) / 10.0),
            height_cm: tenths.map(|t| f64::from(t % 100 + 50)),
            bmi: tenths.map(|t| f64::from(t % 400) / 10.0),
            status_key: status,
            status_label: status.label().to_string(),
            created_at: Utc.timestamp_millis_opt(millis).unwrap(),
            updated_at: None,
        })
}

proptest! {
    #[test]
    fn classification_matches_thresholds(weight in 1.0f64..200.0, height in 40.0f64..220.0) {
        let bmi = compute_bmi(Some(weight), Some(height)).unwrap();
        let expected = if bmi < 18.5 {
            StatusKey::Underweight
        } else if bmi < 25.0 {
            StatusKey::Normal
        } else if bmi < 30.0 {
            StatusKey::Overweight
        } else {
            StatusKey::Obese
        };
        prop_assert_eq!(classify(Some(bmi)), expected);
    }

    #[test]
    fn zero_measurements_have_no_bmi(value in 0.1f64..500.0) {
        prop_assert_eq!(compute_bmi(Some(0.0), Some(value)), None);
        prop_assert_eq!(compute_bmi(Some(value), Some(0.0)), None);
        prop_assert_eq!(compute_bmi(None, Some(value)), None);
    }

    #[test]
    fn global_counts_never_lose_records(records in proptest::collection::vec(record_strategy(), 0..40)) {
        let summary = aggregate_global(&records);
        let unknown = records.iter().filter(|r| r.status_key == StatusKey::Unknown).count() as u64;
        prop_assert_eq!(summary.total, records.len() as u64);
        prop_assert_eq!(
            summary.normal + summary.underweight + summary.overweight + summary.obese + unknown,
            summary.total
        );
    }

    #[test]
    fn barangay_groups_partition_records(records in proptest::collection::vec(record_strategy(), 0..40)) {
        let groups = group_by_barangay(&records);
        let total: u64 = groups.values().map(|g| g.counts.total).sum();
        prop_assert_eq!(total, records.len() as u64);
        for group in groups.values() {
            let c = &group.counts;
            prop_assert!(c.normal + c.underweight + c.overweight + c.obese <= c.total);
        }
    }

    #[test]
    fn save_then_load_is_lossless(records in proptest::collection::vec(record_strategy(), 0..20)) {
        let store = RecordStore::in_memory("NUTRI_CHILDREN_V1");
        store.save(&records).unwrap();
        prop_assert_eq!(store.load(), records);
    }
}
