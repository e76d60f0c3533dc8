use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{MeterError, Result};

/// Default name of the whole-house channel.
pub const DEFAULT_AGGREGATE: &str = "aggregate";

/// Span (in days, inclusive) up to which readings are bucketed hourly.
pub const HOURLY_SPAN_LIMIT_DAYS: i64 = 30;

// ── ChannelCatalog ────────────────────────────────────────────────────────────

/// Mapping from channel id to appliance name, in `labels.dat` order.
///
/// Re-inserting an existing id replaces its name but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelCatalog {
    entries: Vec<(u32, String)>,
    positions: HashMap<u32, usize>,
}

impl ChannelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a channel. Returns the previous name, if any.
    pub fn insert(&mut self, id: u32, name: impl Into<String>) -> Option<String> {
        let name = name.into();
        match self.positions.get(&id) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, name)),
            None => {
                self.positions.insert(id, self.entries.len());
                self.entries.push((id, name));
                None
            }
        }
    }

    /// Appliance name of channel `id`.
    pub fn get(&self, id: u32) -> Option<&str> {
        self.positions
            .get(&id)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    /// `(id, name)` pairs in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.entries.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── ChannelSeries ─────────────────────────────────────────────────────────────

/// A single meter reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// The readings of one channel, sorted ascending with unique timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSeries {
    pub channel_id: u32,
    /// Appliance name; becomes the column name after merging.
    pub name: String,
    pub readings: Vec<Reading>,
}

impl ChannelSeries {
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

// ── TimeTable ─────────────────────────────────────────────────────────────────

/// Column-major table of readings indexed by timestamp.
///
/// Every column holds exactly `index.len()` values and the index is sorted
/// ascending without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeTable {
    columns: Vec<String>,
    index: Vec<NaiveDateTime>,
    values: Vec<Vec<f64>>,
}

/// The table produced by merging every loaded channel.
pub type MergedTable = TimeTable;

impl TimeTable {
    /// Build a table from its parts.
    ///
    /// `values[c][r]` is the value of column `c` at `index[r]`.
    pub fn new(columns: Vec<String>, index: Vec<NaiveDateTime>, values: Vec<Vec<f64>>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        debug_assert!(values.iter().all(|col| col.len() == index.len()));
        debug_assert!(index.windows(2).all(|w| w[0] < w[1]));
        Self {
            columns,
            index,
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_position(name).is_some()
    }

    /// Values of column `name`, one per row.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.column_position(name).map(|pos| self.values[pos].as_slice())
    }

    /// Values of the column at position `pos`.
    pub fn column_at(&self, pos: usize) -> &[f64] {
        &self.values[pos]
    }

    /// `(name, values)` for every column, in column order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// Values of row `row`, in column order.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.values.iter().map(|col| col[row]).collect()
    }

    /// Sum of all columns at row `row`.
    pub fn row_sum(&self, row: usize) -> f64 {
        self.values.iter().map(|col| col[row]).sum()
    }

    /// Sum of each column, in column order.
    pub fn column_totals(&self) -> Vec<(String, f64)> {
        self.iter_columns()
            .map(|(name, values)| (name.to_string(), values.iter().sum()))
            .collect()
    }

    /// First and last calendar date covered by the index.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.index.first(), self.index.last()) {
            (Some(first), Some(last)) => Some((first.date(), last.date())),
            _ => None,
        }
    }

    /// Rows whose summed value is strictly positive.
    pub fn nonzero_rows(&self) -> TimeTable {
        let keep: Vec<usize> = (0..self.len()).filter(|&r| self.row_sum(r) > 0.0).collect();
        self.select_rows(&keep)
    }

    /// The last `n` rows.
    pub fn tail(&self, n: usize) -> TimeTable {
        let start = self.len().saturating_sub(n);
        let keep: Vec<usize> = (start..self.len()).collect();
        self.select_rows(&keep)
    }

    /// A new table holding only the given rows (ascending positions).
    pub fn select_rows(&self, rows: &[usize]) -> TimeTable {
        TimeTable {
            columns: self.columns.clone(),
            index: rows.iter().map(|&r| self.index[r]).collect(),
            values: self
                .values
                .iter()
                .map(|col| rows.iter().map(|&r| col[r]).collect())
                .collect(),
        }
    }
}

// ── Granularity ───────────────────────────────────────────────────────────────

/// Width of the resampling buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    /// Pick the bucket width for an inclusive span of `span_days` days.
    pub fn for_span(span_days: i64) -> Self {
        if span_days <= HOURLY_SPAN_LIMIT_DAYS {
            Granularity::Hourly
        } else {
            Granularity::Daily
        }
    }

    pub fn width(self) -> Duration {
        match self {
            Granularity::Hourly => Duration::hours(1),
            Granularity::Daily => Duration::days(1),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }
}

// ── FilterSpec ────────────────────────────────────────────────────────────────

/// A user request: inclusive date bounds plus the appliances to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Selected columns, in display order.
    pub appliances: Vec<String>,
}

impl FilterSpec {
    pub fn new(start: NaiveDate, end: NaiveDate, appliances: Vec<String>) -> Self {
        Self {
            start,
            end,
            appliances,
        }
    }

    /// Reject requests that cannot be answered regardless of the data.
    pub fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(MeterError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        if self.appliances.is_empty() {
            return Err(MeterError::EmptySelection);
        }
        Ok(())
    }

    /// Number of calendar days covered, both ends included.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Bucket width implied by the span.
    pub fn granularity(&self) -> Granularity {
        Granularity::for_span(self.span_days())
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ── ResampledTable ────────────────────────────────────────────────────────────

/// Filtered readings summed into fixed-width buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResampledTable {
    pub granularity: Granularity,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub table: TimeTable,
}

impl ResampledTable {
    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        self.table.index()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.table.column(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

// ── Anomalies ─────────────────────────────────────────────────────────────────

/// A bucket whose value lies beyond the z-score threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub zscore: f64,
}

/// Anomalous buckets per appliance, in selection order.
///
/// Appliances without anomalies are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    entries: Vec<(String, Vec<Anomaly>)>,
}

impl AnomalyReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the anomalies of one appliance; empty lists are dropped.
    pub fn push(&mut self, appliance: impl Into<String>, anomalies: Vec<Anomaly>) {
        if !anomalies.is_empty() {
            self.entries.push((appliance.into(), anomalies));
        }
    }

    pub fn get(&self, appliance: &str) -> Option<&[Anomaly]> {
        self.entries
            .iter()
            .find(|(name, _)| name == appliance)
            .map(|(_, list)| list.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Anomaly])> {
        self.entries
            .iter()
            .map(|(name, list)| (name.as_str(), list.as_slice()))
    }

    /// `(appliance, anomaly count)` pairs.
    pub fn counts(&self) -> Vec<(String, usize)> {
        self.entries
            .iter()
            .map(|(name, list)| (name.clone(), list.len()))
            .collect()
    }

    /// Number of appliances with at least one anomaly.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── UsageSummary ──────────────────────────────────────────────────────────────

/// Headline metrics shown above the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Total VAh across the appliances that count towards consumption.
    pub total_consumption: f64,
    /// Mean of the per-appliance bucket means; absent when only the
    /// aggregate is selected.
    pub average_per_appliance: Option<f64>,
    /// Appliance with the largest total and that total.
    pub top_consumer: Option<(String, f64)>,
}
