use crate::analyzers::types::VehicleSummary;
use crate::ingest::ViolationRecord;
use crate::reference::ReferenceData;
use std::collections::HashMap;
use tracing::debug;

/// Aggregates violation records into one [`VehicleSummary`] per vehicle.
///
/// Records without a vehicle or with a zero speed are skipped. The first
/// record of a vehicle seeds its top speed, which afterwards only moves on a
/// strictly greater speed, so among equal maxima the first record's limit is
/// kept. The result is sorted by top speed, descending; vehicles with equal
/// top speeds keep first-seen order.
pub fn aggregate<'a>(
    records: impl IntoIterator<Item = &'a ViolationRecord>,
    reference: &ReferenceData,
) -> Vec<VehicleSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut summaries: Vec<VehicleSummary> = Vec::new();
    let mut skipped = 0usize;

    for record in records {
        if !record.is_violation() {
            skipped += 1;
            continue;
        }

        let slot = *index.entry(record.vehicle.as_str()).or_insert_with(|| {
            summaries.push(VehicleSummary {
                vehicle: record.vehicle.clone(),
                violation_count: 0,
                top_speed: record.speed,
                limit_at_top_speed: record.limit,
                group: String::new(),
            });
            summaries.len() - 1
        });

        let summary = &mut summaries[slot];
        summary.violation_count += 1;

        if record.speed > summary.top_speed {
            summary.top_speed = record.speed;
            summary.limit_at_top_speed = record.limit;
        }
    }

    regroup(&mut summaries, reference);

    // `sort_by` is stable: ties keep first-seen order.
    summaries.sort_by(|a, b| b.top_speed.total_cmp(&a.top_speed));

    debug!(vehicles = summaries.len(), skipped, "Violations aggregated");
    summaries
}

/// Re-resolves the group of every summary against fresh reference data.
/// Counts and speeds are left untouched.
pub fn regroup(summaries: &mut [VehicleSummary], reference: &ReferenceData) {
    for summary in summaries {
        summary.group = reference.group_for_plate(&summary.vehicle).to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::NO_GROUP;
    use serde_json::json;

    fn record(vehicle: &str, speed: f64, limit: f64) -> ViolationRecord {
        ViolationRecord {
            vehicle: vehicle.to_string(),
            speed,
            limit,
            ..Default::default()
        }
    }

    fn reference() -> ReferenceData {
        let rows = json!([
            {"placa": "P1", "grupo": "Frota A"},
            {"placa": "P3", "grupo": "Frota B"}
        ]);
        ReferenceData::from_rows(
            rows.as_array()
                .unwrap()
                .iter()
                .map(|r| r.as_object().cloned().unwrap())
                .collect(),
            vec![],
        )
    }

    #[test]
    fn test_two_vehicles_scenario() {
        let records = vec![
            record("P1", 80.0, 60.0),
            record("P1", 95.0, 60.0),
            record("P2", 50.0, 60.0),
            record("P2", 0.0, 60.0),
        ];
        let summaries = aggregate(&records, &ReferenceData::empty());

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].vehicle, "P1");
        assert_eq!(summaries[0].violation_count, 2);
        assert_eq!(summaries[0].top_speed, 95.0);
        assert_eq!(summaries[0].limit_at_top_speed, 60.0);
        assert_eq!(summaries[1].vehicle, "P2");
        assert_eq!(summaries[1].violation_count, 1);
        assert_eq!(summaries[1].top_speed, 50.0);
        assert_eq!(summaries[1].limit_at_top_speed, 60.0);
    }

    #[test]
    fn test_limit_follows_top_speed_event() {
        let records = vec![
            record("P1", 90.0, 80.0),
            record("P1", 110.0, 60.0),
            record("P1", 100.0, 40.0),
        ];
        let summaries = aggregate(&records, &ReferenceData::empty());
        assert_eq!(summaries[0].top_speed, 110.0);
        assert_eq!(summaries[0].limit_at_top_speed, 60.0);
    }

    #[test]
    fn test_tied_top_speed_keeps_first_limit() {
        let records = vec![record("P1", 100.0, 80.0), record("P1", 100.0, 60.0)];
        let summaries = aggregate(&records, &ReferenceData::empty());
        assert_eq!(summaries[0].limit_at_top_speed, 80.0);
        assert_eq!(summaries[0].violation_count, 2);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let records = vec![
            record("B", 90.0, 60.0),
            record("A", 120.0, 60.0),
            record("C", 90.0, 60.0),
            record("D", 90.0, 60.0),
        ];
        let order: Vec<_> = aggregate(&records, &ReferenceData::empty())
            .into_iter()
            .map(|s| s.vehicle)
            .collect();
        assert_eq!(order, ["A", "B", "C", "D"]);
    }

    #[test]
    fn test_invalid_rows_skipped() {
        let records = vec![
            record("", 120.0, 60.0),
            record("P1", 0.0, 60.0),
            record("P2", -5.0, 60.0),
        ];
        let summaries = aggregate(&records, &ReferenceData::empty());
        // Only exactly-zero speeds are dropped.
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].vehicle, "P2");
    }

    #[test]
    fn test_distinct_vehicle_count() {
        let records: Vec<_> = (0..50)
            .map(|i| record(&format!("V{}", i % 7), 60.0 + i as f64, 50.0))
            .collect();
        assert_eq!(aggregate(&records, &ReferenceData::empty()).len(), 7);
    }

    #[test]
    fn test_empty_input() {
        let records: Vec<ViolationRecord> = Vec::new();
        assert!(aggregate(&records, &ReferenceData::empty()).is_empty());
    }

    #[test]
    fn test_groups_resolved_and_regrouped() {
        let records = vec![record("P1-2", 90.0, 60.0), record("P2", 80.0, 60.0)];
        let mut summaries = aggregate(&records, &reference());
        assert_eq!(summaries[0].group, "Frota A");
        assert_eq!(summaries[1].group, NO_GROUP);

        let before = summaries.clone();
        regroup(&mut summaries, &ReferenceData::empty());
        assert_eq!(summaries[0].group, NO_GROUP);
        assert_eq!(summaries[0].top_speed, before[0].top_speed);
        assert_eq!(summaries[0].violation_count, before[0].violation_count);
    }
}
