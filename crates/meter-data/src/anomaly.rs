//! Fixed-threshold z-score outlier detection.

use meter_core::models::{Anomaly, AnomalyReport, ResampledTable};
use meter_core::stats::zscores;
use tracing::debug;

/// Flag buckets whose population z-score magnitude exceeds `threshold`.
///
/// The `aggregate` column is skipped. Columns with zero variance cannot have
/// outliers and contribute nothing. Appliances appear in column order.
pub fn detect_anomalies(table: &ResampledTable, aggregate: &str, threshold: f64) -> AnomalyReport {
    let mut report = AnomalyReport::new();

    for (name, values) in table.table.iter_columns() {
        if name == aggregate {
            continue;
        }
        let Some(scores) = zscores(values) else {
            debug!("{}: zero variance, no anomalies possible", name);
            continue;
        };

        let anomalies: Vec<Anomaly> = table
            .index()
            .iter()
            .zip(values)
            .zip(&scores)
            .filter(|(_, z)| z.abs() > threshold)
            .map(|((&timestamp, &value), &zscore)| Anomaly {
                timestamp,
                value,
                zscore,
            })
            .collect();

        if !anomalies.is_empty() {
            debug!("{}: {} anomalous buckets", name, anomalies.len());
        }
        report.push(name, anomalies);
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use meter_core::models::{Granularity, TimeTable};
    use meter_core::stats::DEFAULT_ZSCORE_THRESHOLD;

    fn hours(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2011, 4, 18)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|h| start + Duration::hours(h as i64)).collect()
    }

    fn resampled(columns: &[(&str, Vec<f64>)]) -> ResampledTable {
        let n = columns[0].1.len();
        let day = NaiveDate::from_ymd_opt(2011, 4, 18).unwrap();
        ResampledTable {
            granularity: Granularity::Hourly,
            start: day,
            end: day,
            table: TimeTable::new(
                columns.iter().map(|(n, _)| n.to_string()).collect(),
                hours(n),
                columns.iter().map(|(_, v)| v.clone()).collect(),
            ),
        }
    }

    fn spike() -> Vec<f64> {
        let mut values = vec![0.0; 24];
        values[13] = 50.0;
        values
    }

    #[test]
    fn test_single_spike_is_flagged() {
        let table = resampled(&[("aggregate", vec![100.0; 24]), ("fridge", spike())]);
        let report = detect_anomalies(&table, "aggregate", DEFAULT_ZSCORE_THRESHOLD);

        let fridge = report.get("fridge").unwrap();
        assert_eq!(fridge.len(), 1);
        assert_eq!(fridge[0].timestamp, hours(24)[13]);
        assert_eq!(fridge[0].value, 50.0);
        // sqrt(23) for one spike among 24 buckets
        assert!((fridge[0].zscore - 23f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_high_variance_has_no_anomalies() {
        let alternating: Vec<f64> = (0..24).map(|i| if i % 2 == 0 { 0.0 } else { 50.0 }).collect();
        let table = resampled(&[("aggregate", spike()), ("fridge", alternating)]);
        let report = detect_anomalies(&table, "aggregate", DEFAULT_ZSCORE_THRESHOLD);
        assert!(report.is_empty());
    }

    #[test]
    fn test_aggregate_is_never_reported() {
        let table = resampled(&[("aggregate", spike())]);
        let report = detect_anomalies(&table, "aggregate", DEFAULT_ZSCORE_THRESHOLD);
        assert!(report.get("aggregate").is_none());
    }

    #[test]
    fn test_custom_aggregate_name() {
        let table = resampled(&[("aggregate", spike()), ("mains", spike())]);
        let report = detect_anomalies(&table, "mains", DEFAULT_ZSCORE_THRESHOLD);
        assert!(report.get("aggregate").is_some());
        assert!(report.get("mains").is_none());
    }

    #[test]
    fn test_zero_variance_column_is_skipped() {
        let table = resampled(&[("fridge", vec![7.0; 24])]);
        assert!(detect_anomalies(&table, "aggregate", DEFAULT_ZSCORE_THRESHOLD).is_empty());
    }

    #[test]
    fn test_threshold_is_strict_and_explicit() {
        let table = resampled(&[("fridge", spike())]);
        // z of the spike is sqrt(23) ≈ 4.80
        assert_eq!(detect_anomalies(&table, "aggregate", 4.0).len(), 1);
        assert!(detect_anomalies(&table, "aggregate", 5.0).is_empty());
    }

    #[test]
    fn test_detection_is_deterministic() {
        let table = resampled(&[("fridge", spike()), ("kettle", spike())]);
        let a = detect_anomalies(&table, "aggregate", DEFAULT_ZSCORE_THRESHOLD);
        let b = detect_anomalies(&table, "aggregate", DEFAULT_ZSCORE_THRESHOLD);
        assert_eq!(a, b);
        let names: Vec<&str> = a.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["fridge", "kettle"]);
    }
}
