//! Outer join of channel series on the timestamp axis.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use meter_core::models::{ChannelSeries, MergedTable};

/// Align every series on the union of their timestamps.
///
/// Columns follow the order of `series`; a channel without a reading at a
/// given timestamp contributes `0.0` there.
pub fn merge_series(series: &[ChannelSeries]) -> MergedTable {
    let index: Vec<NaiveDateTime> = series
        .iter()
        .flat_map(|s| s.readings.iter().map(|r| r.timestamp))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let columns: Vec<String> = series.iter().map(|s| s.name.clone()).collect();
    let values: Vec<Vec<f64>> = series.iter().map(|s| align(s, &index)).collect();

    MergedTable::new(columns, index, values)
}

/// Spread one sorted series over the shared index.
fn align(series: &ChannelSeries, index: &[NaiveDateTime]) -> Vec<f64> {
    let mut column = vec![0.0; index.len()];
    let mut row = 0;
    for reading in &series.readings {
        // Both sides are sorted and the index is a superset, so the cursor
        // only moves forward.
        while index[row] < reading.timestamp {
            row += 1;
        }
        column[row] = reading.value;
    }
    column
}
