//! Date-range filtering and fixed-width resampling.
//!
//! A request is answered in four steps: validate the [`FilterSpec`], slice
//! the merged table to the requested days and columns, sum the slice into
//! hourly or daily buckets, then clip the buckets back to the requested days.

use chrono::NaiveDateTime;
use meter_core::error::{MeterError, Result};
use meter_core::models::{FilterSpec, Granularity, MergedTable, ResampledTable, TimeTable};
use meter_core::time_utils::floor_to_bucket;
use tracing::debug;

/// Filter `table` by `spec` and resample the result.
pub fn filter_and_resample(table: &MergedTable, spec: &FilterSpec) -> Result<ResampledTable> {
    spec.validate()?;

    let sliced = slice(table, spec)?;
    if sliced.is_empty() {
        return Err(MeterError::EmptyRange {
            start: spec.start,
            end: spec.end,
        });
    }

    let granularity = spec.granularity();
    let bucketed = resample(&sliced, granularity);
    let clipped = clip_to_dates(&bucketed, spec);

    debug!(
        "Resampled {} rows into {} {} buckets ({} days)",
        sliced.len(),
        clipped.len(),
        granularity.label(),
        spec.span_days()
    );

    Ok(ResampledTable {
        granularity,
        start: spec.start,
        end: spec.end,
        table: clipped,
    })
}

/// Rows whose calendar date lies in `[spec.start, spec.end]`, restricted to
/// the selected columns in selection order.
///
/// Repeated selections are shown once; unknown names are rejected.
pub fn slice(table: &MergedTable, spec: &FilterSpec) -> Result<TimeTable> {
    let mut positions: Vec<usize> = Vec::with_capacity(spec.appliances.len());
    for name in &spec.appliances {
        let pos = table
            .column_position(name)
            .ok_or_else(|| MeterError::UnknownAppliance(name.clone()))?;
        if !positions.contains(&pos) {
            positions.push(pos);
        }
    }

    let rows: Vec<usize> = table
        .index()
        .iter()
        .enumerate()
        .filter(|(_, ts)| spec.contains_date(ts.date()))
        .map(|(row, _)| row)
        .collect();

    let columns = positions
        .iter()
        .map(|&pos| table.columns()[pos].clone())
        .collect();
    let index = rows.iter().map(|&row| table.index()[row]).collect();
    let values = positions
        .iter()
        .map(|&pos| {
            let column = table.column_at(pos);
            rows.iter().map(|&row| column[row]).collect()
        })
        .collect();

    Ok(TimeTable::new(columns, index, values))
}

/// Sum `table` into contiguous left-closed buckets.
///
/// Buckets run from the one holding the first row to the one holding the
/// last row; buckets without readings are kept with a zero sum.
pub fn resample(table: &TimeTable, granularity: Granularity) -> TimeTable {
    let (Some(&first), Some(&last)) = (table.index().first(), table.index().last()) else {
        return TimeTable::new(
            table.columns().to_vec(),
            Vec::new(),
            vec![Vec::new(); table.columns().len()],
        );
    };

    let width = granularity.width();
    let first_bucket = floor_to_bucket(first, granularity);
    let last_bucket = floor_to_bucket(last, granularity);
    let buckets = ((last_bucket - first_bucket).num_seconds() / width.num_seconds()) as usize + 1;

    let index: Vec<NaiveDateTime> = (0..buckets)
        .map(|i| first_bucket + width * i as i32)
        .collect();

    let slot_of = |ts: NaiveDateTime| -> usize {
        ((floor_to_bucket(ts, granularity) - first_bucket).num_seconds() / width.num_seconds())
            as usize
    };
    let slots: Vec<usize> = table.index().iter().map(|&ts| slot_of(ts)).collect();

    let values = table
        .iter_columns()
        .map(|(_, column)| {
            let mut sums = vec![0.0; buckets];
            for (&slot, &value) in slots.iter().zip(column) {
                sums[slot] += value;
            }
            sums
        })
        .collect();

    TimeTable::new(table.columns().to_vec(), index, values)
}

/// Drop buckets whose start date falls outside the requested days.
fn clip_to_dates(table: &TimeTable, spec: &FilterSpec) -> TimeTable {
    let keep: Vec<usize> = table
        .index()
        .iter()
        .enumerate()
        .filter(|(_, ts)| spec.contains_date(ts.date()))
        .map(|(row, _)| row)
        .collect();
    if keep.len() == table.len() {
        return table.clone();
    }
    table.select_rows(&keep)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, min: u32) -> NaiveDateTime {
        d.and_hms_opt(h, min, 0).unwrap()
    }

    /// Two columns, readings every 30 minutes for `days` days starting on
    /// 2013-04-01. aggregate = 2.0, fridge = 1.0 per reading.
    fn half_hourly_table(days: u32) -> MergedTable {
        let start = date(2013, 4, 1);
        let mut index = Vec::new();
        for day in 0..days {
            let d = start + chrono::Duration::days(day as i64);
            for h in 0..24 {
                index.push(at(d, h, 0));
                index.push(at(d, h, 30));
            }
        }
        let n = index.len();
        MergedTable::new(
            vec!["aggregate".into(), "fridge".into()],
            index,
            vec![vec![2.0; n], vec![1.0; n]],
        )
    }

    fn spec(start: NaiveDate, end: NaiveDate, cols: &[&str]) -> FilterSpec {
        FilterSpec::new(start, end, cols.iter().map(|c| c.to_string()).collect())
    }

    // ── validation ────────────────────────────────────────────────────────────

    #[test]
    fn test_reversed_range_rejected() {
        let table = half_hourly_table(2);
        let err = filter_and_resample(
            &table,
            &spec(date(2013, 4, 2), date(2013, 4, 1), &["aggregate"]),
        )
        .unwrap_err();
        assert!(matches!(err, MeterError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_empty_selection_rejected() {
        let table = half_hourly_table(2);
        let err =
            filter_and_resample(&table, &spec(date(2013, 4, 1), date(2013, 4, 1), &[])).unwrap_err();
        assert!(matches!(err, MeterError::EmptySelection));
    }

    #[test]
    fn test_unknown_appliance_rejected() {
        let table = half_hourly_table(1);
        let err = filter_and_resample(
            &table,
            &spec(date(2013, 4, 1), date(2013, 4, 1), &["kettle"]),
        )
        .unwrap_err();
        assert!(matches!(err, MeterError::UnknownAppliance(name) if name == "kettle"));
    }

    #[test]
    fn test_range_after_last_timestamp_is_empty() {
        let table = half_hourly_table(2);
        let err = filter_and_resample(
            &table,
            &spec(date(2013, 5, 1), date(2013, 5, 3), &["aggregate"]),
        )
        .unwrap_err();
        assert!(matches!(err, MeterError::EmptyRange { .. }));
    }

    // ── slicing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_slice_includes_whole_end_day() {
        let table = half_hourly_table(3);
        let sliced = slice(
            &table,
            &spec(date(2013, 4, 2), date(2013, 4, 2), &["fridge"]),
        )
        .unwrap();
        assert_eq!(sliced.len(), 48);
        assert_eq!(sliced.index()[0], at(date(2013, 4, 2), 0, 0));
        assert_eq!(sliced.index()[47], at(date(2013, 4, 2), 23, 30));
    }

    #[test]
    fn test_slice_preserves_selection_order_and_dedups() {
        let table = half_hourly_table(1);
        let sliced = slice(
            &table,
            &spec(
                date(2013, 4, 1),
                date(2013, 4, 1),
                &["fridge", "aggregate", "fridge"],
            ),
        )
        .unwrap();
        assert_eq!(sliced.columns(), &["fridge", "aggregate"]);
    }

    // ── resampling ────────────────────────────────────────────────────────────

    #[test]
    fn test_short_span_is_hourly() {
        let table = half_hourly_table(3);
        let out = filter_and_resample(
            &table,
            &spec(date(2013, 4, 1), date(2013, 4, 3), &["aggregate", "fridge"]),
        )
        .unwrap();
        assert_eq!(out.granularity, Granularity::Hourly);
        assert_eq!(out.len(), 72);
        assert!(out.index().windows(2).all(|w| w[1] - w[0] == chrono::Duration::hours(1)));
        assert!(out.column("aggregate").unwrap().iter().all(|&v| v == 4.0));
    }

    #[test]
    fn test_long_span_is_daily() {
        let table = half_hourly_table(40);
        let out = filter_and_resample(
            &table,
            &spec(date(2013, 4, 1), date(2013, 5, 10), &["fridge"]),
        )
        .unwrap();
        assert_eq!(out.granularity, Granularity::Daily);
        assert_eq!(out.len(), 40);
        assert!(out.index().iter().all(|ts| ts.hour() == 0 && ts.minute() == 0));
        assert!(out.column("fridge").unwrap().iter().all(|&v| v == 48.0));
    }

    #[test]
    fn test_thirty_day_span_stays_hourly() {
        let table = half_hourly_table(30);
        let out = filter_and_resample(
            &table,
            &spec(date(2013, 4, 1), date(2013, 4, 30), &["fridge"]),
        )
        .unwrap();
        assert_eq!(out.granularity, Granularity::Hourly);
        assert_eq!(out.len(), 30 * 24);
    }

    #[test]
    fn test_sum_is_preserved() {
        let table = half_hourly_table(5);
        let s = spec(date(2013, 4, 2), date(2013, 4, 4), &["aggregate", "fridge"]);
        let sliced = slice(&table, &s).unwrap();
        let out = filter_and_resample(&table, &s).unwrap();
        for name in ["aggregate", "fridge"] {
            let before: f64 = sliced.column(name).unwrap().iter().sum();
            let after: f64 = out.column(name).unwrap().iter().sum();
            assert!((before - after).abs() < 1e-9, "{name}: {before} vs {after}");
        }
    }

    #[test]
    fn test_gaps_produce_zero_buckets() {
        let d = date(2013, 4, 1);
        let table = MergedTable::new(
            vec!["aggregate".into()],
            vec![at(d, 1, 15), at(d, 4, 45)],
            vec![vec![3.0, 7.0]],
        );
        let out = filter_and_resample(&table, &spec(d, d, &["aggregate"])).unwrap();
        assert_eq!(out.index().first(), Some(&at(d, 1, 0)));
        assert_eq!(out.index().last(), Some(&at(d, 4, 0)));
        assert_eq!(out.column("aggregate"), Some(&[3.0, 0.0, 0.0, 7.0][..]));
    }

    #[test]
    fn test_outputs_within_requested_dates() {
        let table = half_hourly_table(10);
        let s = spec(date(2013, 4, 3), date(2013, 4, 6), &["fridge"]);
        let out = filter_and_resample(&table, &s).unwrap();
        assert!(out.index().iter().all(|ts| s.contains_date(ts.date())));
    }

    #[test]
    fn test_resample_empty_table() {
        let table = TimeTable::new(vec!["a".into()], vec![], vec![vec![]]);
        let out = resample(&table, Granularity::Hourly);
        assert!(out.is_empty());
        assert_eq!(out.columns(), &["a"]);
    }
}
