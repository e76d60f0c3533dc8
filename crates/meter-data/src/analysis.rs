//! End-to-end analysis pipeline for the energy dashboard.
//!
//! [`load_house_data`] turns a data directory into a [`LoadedData`] once;
//! [`analyze`] answers one filter request against it, returning a
//! [`FilterOutcome`] ready for the UI and report layers.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use meter_core::error::Result;
use meter_core::models::{
    AnomalyReport, ChannelCatalog, FilterSpec, MergedTable, ResampledTable, UsageSummary,
};
use meter_core::stats::{mean, ColumnStats};
use tracing::info;

use crate::anomaly::detect_anomalies;
use crate::catalog::load_catalog;
use crate::merger::merge_series;
use crate::reader::{load_channels, ChannelWarning};
use crate::resampler::filter_and_resample;

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside a load.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoadMetadata {
    /// RFC 3339 timestamp of the load.
    pub generated_at: String,
    pub data_dir: String,
    pub channels_cataloged: usize,
    pub channels_loaded: usize,
    /// Cataloged channels without a source file.
    pub channels_missing: usize,
    /// Channels dropped because their file was malformed.
    pub channels_rejected: usize,
    pub rows: usize,
    /// Wall-clock seconds spent reading the catalog and channel files.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent merging the series.
    pub merge_time_seconds: f64,
}

/// Everything read from one data directory.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub catalog: ChannelCatalog,
    pub table: MergedTable,
    pub warnings: Vec<ChannelWarning>,
    pub missing: Vec<u32>,
    pub metadata: LoadMetadata,
}

/// The answer to one filter request.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub resampled: ResampledTable,
    pub anomalies: AnomalyReport,
    pub stats: Vec<ColumnStats>,
    pub summary: UsageSummary,
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Load the catalog and every channel under `data_dir` and merge them.
///
/// Catalog problems and an empty load are fatal; per-channel problems are
/// returned as warnings.
pub fn load_house_data(data_dir: &Path) -> Result<LoadedData> {
    let load_start = Instant::now();
    let catalog = load_catalog(data_dir)?;
    let channels = load_channels(&catalog, data_dir)?;
    let load_time = load_start.elapsed().as_secs_f64();

    let merge_start = Instant::now();
    let table = merge_series(&channels.series);
    let merge_time = merge_start.elapsed().as_secs_f64();

    let metadata = LoadMetadata {
        generated_at: Utc::now().to_rfc3339(),
        data_dir: data_dir.display().to_string(),
        channels_cataloged: catalog.len(),
        channels_loaded: channels.series.len(),
        channels_missing: channels.missing.len(),
        channels_rejected: channels.rejected().count(),
        rows: table.len(),
        load_time_seconds: load_time,
        merge_time_seconds: merge_time,
    };

    info!(
        "Loaded {} of {} channels ({} rows) from {} in {:.3}s",
        metadata.channels_loaded,
        metadata.channels_cataloged,
        metadata.rows,
        metadata.data_dir,
        load_time + merge_time
    );

    Ok(LoadedData {
        catalog,
        table,
        warnings: channels.warnings,
        missing: channels.missing,
        metadata,
    })
}

// ── Defaults ──────────────────────────────────────────────────────────────────

/// The request shown before the user picks anything: the full available
/// range, and either every column or the aggregate.
///
/// Falls back to the first column when no column carries the aggregate
/// name. Returns `None` for an empty table.
pub fn default_filter(table: &MergedTable, all_appliances: bool, aggregate: &str) -> Option<FilterSpec> {
    let (start, end) = table.date_range()?;
    let appliances = if all_appliances {
        table.columns().to_vec()
    } else if table.has_column(aggregate) {
        vec![aggregate.to_string()]
    } else {
        vec![table.columns().first()?.clone()]
    };
    Some(FilterSpec::new(start, end, appliances))
}

// ── Per-request analysis ──────────────────────────────────────────────────────

/// Filter, resample, detect anomalies and summarise in one pass.
///
/// Errors are the filter errors of [`filter_and_resample`]; `table` is only
/// read, so a failed request leaves it untouched.
pub fn analyze(
    table: &MergedTable,
    spec: &FilterSpec,
    aggregate: &str,
    threshold: f64,
) -> Result<FilterOutcome> {
    let resampled = filter_and_resample(table, spec)?;
    let anomalies = detect_anomalies(&resampled, aggregate, threshold);
    let stats = describe(&resampled);
    let summary = summarize_usage(&resampled, aggregate);

    info!(
        "{} to {}: {} {} buckets, {} appliances with anomalies",
        spec.start,
        spec.end,
        resampled.len(),
        resampled.granularity.label(),
        anomalies.len()
    );

    Ok(FilterOutcome {
        resampled,
        anomalies,
        stats,
        summary,
    })
}

/// [`ColumnStats`] for every column of `table`.
pub fn describe(table: &ResampledTable) -> Vec<ColumnStats> {
    table
        .table
        .iter_columns()
        .map(|(name, values)| ColumnStats::describe(name, values))
        .collect()
}

/// Column totals sorted descending, at most `n` of them.
///
/// Equal totals keep column order.
pub fn top_consumers(table: &ResampledTable, n: usize) -> Vec<(String, f64)> {
    let mut totals = table.table.column_totals();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));
    totals.truncate(n);
    totals
}

/// Headline metrics for the dashboard.
///
/// With several columns the aggregate is left out so that appliances are
/// not double counted. A lone aggregate column only has a total.
pub fn summarize_usage(table: &ResampledTable, aggregate: &str) -> UsageSummary {
    let columns: Vec<(&str, &[f64])> = table.table.iter_columns().collect();

    if let [(name, values)] = columns.as_slice() {
        let total: f64 = values.iter().sum();
        return UsageSummary {
            total_consumption: total,
            average_per_appliance: None,
            top_consumer: (*name != aggregate).then(|| (name.to_string(), total)),
        };
    }

    let appliances: Vec<(&str, &[f64])> = columns
        .into_iter()
        .filter(|(name, _)| *name != aggregate)
        .collect();

    let totals: Vec<f64> = appliances.iter().map(|(_, v)| v.iter().sum()).collect();
    let means: Vec<f64> = appliances.iter().map(|(_, v)| mean(v)).collect();

    let mut top: Option<(String, f64)> = None;
    for ((name, _), &total) in appliances.iter().zip(&totals) {
        if top.as_ref().map_or(true, |(_, best)| total > *best) {
            top = Some((name.to_string(), total));
        }
    }

    UsageSummary {
        total_consumption: totals.iter().sum(),
        average_per_appliance: (!means.is_empty()).then(|| mean(&means)),
        top_consumer: top,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
