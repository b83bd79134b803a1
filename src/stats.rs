use crate::models::{
    BarangayGroup, BarangayGroups, ChartSeries, ChildRecord, RiskEntry, RiskReport, StatusSummary,
    UNKNOWN_BARANGAY,
};

pub fn aggregate_global(records: &[ChildRecord]) -> StatusSummary {
    let mut summary = StatusSummary::default();
    for record in records {
        summary.record(record.status_key);
    }
    summary
}

/// Grouping key for a barangay: trimmed and lowercased, blank names fall
/// into the unknown group.
pub fn barangay_key(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNKNOWN_BARANGAY.to_lowercase()
    } else {
        trimmed.to_lowercase()
    }
}

/// Partitions records by barangay. Each record lands in exactly one group.
pub fn group_by_barangay(records: &[ChildRecord]) -> BarangayGroups {
    let mut groups = BarangayGroups::new();
    for record in records {
        let group = groups
            .entry(barangay_key(&record.barangay))
            .or_insert_with(|| BarangayGroup {
                name: display_name(&record.barangay),
                counts: StatusSummary::default(),
            });
        group.counts.record(record.status_key);
    }
    groups
}

fn display_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNKNOWN_BARANGAY.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Barangays with the highest obesity and underweight rates. Empty groups
/// are skipped and ties keep the earlier group.
pub fn compute_risk(groups: &BarangayGroups) -> RiskReport {
    let mut report = RiskReport::default();

    for group in groups.values() {
        let counts = &group.counts;
        if counts.total == 0 {
            continue;
        }
        consider(&mut report.highest_obesity, group, counts.obese);
        consider(&mut report.highest_underweight, group, counts.underweight);
    }

    report
}

fn consider(best: &mut Option<RiskEntry>, group: &BarangayGroup, count: u64) {
    let rate = count as f64 / group.counts.total as f64;
    if best.as_ref().is_none_or(|current| rate > current.rate) {
        *best = Some(RiskEntry {
            barangay: group.name.clone(),
            rate,
            count,
            total: group.counts.total,
        });
    }
}

pub fn chart_series(records: &[ChildRecord], groups: &BarangayGroups) -> ChartSeries {
    let mut series = ChartSeries {
        distribution: aggregate_global(records),
        ..ChartSeries::default()
    };
    for group in groups.values() {
        series.labels.push(group.name.clone());
        series.normal.push(group.counts.normal);
        series.underweight.push(group.counts.underweight);
        series.overweight.push(group.counts.overweight);
        series.obese.push(group.counts.obese);
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StatusKey;
    use chrono::Utc;

    fn child(barangay: &str, status: StatusKey) -> ChildRecord {
        ChildRecord {
            id: format!("{barangay}-{}", status.key()),
            name: "Child".to_string(),
            barangay: barangay.to_string(),
            age: None,
            weight_kg: None,
            height_cm: None,
            bmi: None,
            status_key: status,
            status_label: status.label().to_string(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn group(name: &str, total: u64, obese: u64, underweight: u64) -> BarangayGroup {
        BarangayGroup {
            name: name.to_string(),
            counts: StatusSummary {
                total,
                obese,
                underweight,
                ..StatusSummary::default()
            },
        }
    }

    #[test]
    fn global_counts_include_unknown_in_total_only() {
        let records = vec![
            child("Centro", StatusKey::Normal),
            child("Centro", StatusKey::Obese),
            child("Centro", StatusKey::Unknown),
        ];
        let summary = aggregate_global(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.normal, 1);
        assert_eq!(summary.obese, 1);
        assert_eq!(summary.underweight + summary.overweight, 0);
    }

    #[test]
    fn grouping_folds_case_and_whitespace() {
        let records = vec![
            child("Centro", StatusKey::Normal),
            child(" centro ", StatusKey::Underweight),
            child("CENTRO", StatusKey::Obese),
            child("Poblacion", StatusKey::Normal),
        ];
        let groups = group_by_barangay(&records);

        assert_eq!(groups.len(), 2);
        let centro = &groups["centro"];
        assert_eq!(centro.name, "Centro");
        assert_eq!(centro.counts.total, 3);
        assert_eq!(centro.counts.underweight, 1);
        assert_eq!(groups["poblacion"].counts.total, 1);
    }

    #[test]
    fn blank_barangay_groups_as_unknown() {
        let groups = group_by_barangay(&[child("  ", StatusKey::Normal)]);
        assert_eq!(groups["unknown"].name, "Unknown");
    }

    #[test]
    fn groups_are_ordered_alphabetically() {
        let records = vec![
            child("San Roque", StatusKey::Normal),
            child("bagong silang", StatusKey::Normal),
            child("Centro", StatusKey::Normal),
        ];
        let keys: Vec<_> = group_by_barangay(&records).into_keys().collect();
        assert_eq!(keys, vec!["bagong silang", "centro", "san roque"]);
    }

    #[test]
    fn risk_picks_highest_rate() {
        let mut groups = BarangayGroups::new();
        groups.insert("a".to_string(), group("A", 10, 5, 1));
        groups.insert("b".to_string(), group("B", 4, 1, 2));

        let report = compute_risk(&groups);
        let obesity = report.highest_obesity.unwrap();
        assert_eq!(obesity.barangay, "A");
        assert_eq!(obesity.rate, 0.5);
        assert_eq!((obesity.count, obesity.total), (5, 10));
        assert_eq!(report.highest_underweight.unwrap().barangay, "B");
    }

    #[test]
    fn risk_ties_keep_first_group() {
        let mut groups = BarangayGroups::new();
        groups.insert("a".to_string(), group("A", 2, 1, 0));
        groups.insert("b".to_string(), group("B", 4, 2, 0));

        let report = compute_risk(&groups);
        assert_eq!(report.highest_obesity.unwrap().barangay, "A");
        assert_eq!(report.highest_underweight.unwrap().rate, 0.0);
    }

    #[test]
    fn risk_ignores_empty_groups() {
        let mut groups = BarangayGroups::new();
        groups.insert("a".to_string(), group("A", 0, 0, 0));
        groups.insert("b".to_string(), group("B", 0, 0, 0));
        assert_eq!(compute_risk(&groups), RiskReport::default());
        assert_eq!(compute_risk(&BarangayGroups::new()), RiskReport::default());
    }

    #[test]
    fn chart_series_follow_group_order() {
        let records = vec![
            child("Poblacion", StatusKey::Obese),
            child("Centro", StatusKey::Normal),
            child("Centro", StatusKey::Underweight),
        ];
        let groups = group_by_barangay(&records);
        let series = chart_series(&records, &groups);

        assert_eq!(series.labels, vec!["Centro", "Poblacion"]);
        assert_eq!(series.normal, vec![1, 0]);
        assert_eq!(series.underweight, vec![1, 0]);
        assert_eq!(series.obese, vec![0, 1]);
        assert_eq!(series.distribution.total, 3);
    }
}
