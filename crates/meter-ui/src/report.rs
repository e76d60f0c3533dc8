//! Paginated plain-text usage report.
//!
//! The report is laid out as fixed-height pages separated by form feeds.
//! Every page opens with the report title and generation time; sections are
//! moved to the next page whole when they fit there, otherwise split.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tempfile::NamedTempFile;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use meter_core::error::{MeterError, Result};
use meter_core::formatting::{format_energy, format_number, percentage};
use meter_core::models::ResampledTable;
use meter_core::time_utils::format_bucket;
use meter_data::analysis::{top_consumers, FilterOutcome};

/// Default output file name.
pub const DEFAULT_REPORT_FILE: &str = "energy_visual_report.txt";

pub const REPORT_TITLE: &str = "Visual Energy Usage Report";
pub const PAGE_HEIGHT: usize = 60;
pub const PAGE_WIDTH: usize = 100;
pub const TOP_CONSUMERS: usize = 10;

const FORM_FEED: char = '\u{c}';
const SPARK_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const HEAT_GLYPHS: [char; 5] = [' ', '░', '▒', '▓', '█'];
const LABEL_WIDTH: usize = 18;
const BAR_WIDTH: usize = 50;

// ── Text helpers ──────────────────────────────────────────────────────────────

/// Pad or cut `s` to exactly `width` display columns.
fn fit(s: &str, width: usize) -> String {
    if s.width() <= width {
        return format!("{}{}", s, " ".repeat(width - s.width()));
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

/// Right-align `s` in `width` display columns.
fn right(s: &str, width: usize) -> String {
    format!("{}{}", " ".repeat(width.saturating_sub(s.width())), s)
}

/// Average `values` down to at most `cells` points.
fn downsample(values: &[f64], cells: usize) -> Vec<f64> {
    if values.len() <= cells || cells == 0 {
        return values.to_vec();
    }
    (0..cells)
        .map(|i| {
            let lo = i * values.len() / cells;
            let hi = ((i + 1) * values.len() / cells).max(lo + 1);
            let chunk = &values[lo..hi];
            chunk.iter().sum::<f64>() / chunk.len() as f64
        })
        .collect()
}

/// Pick a glyph for `value` on a `0..=max` scale.
fn glyph(glyphs: &[char], value: f64, max: f64) -> char {
    if max <= 0.0 || value <= 0.0 {
        return glyphs[0];
    }
    let last = glyphs.len() - 1;
    let idx = ((value / max) * last as f64).ceil() as usize;
    glyphs[idx.min(last)]
}

fn section_title(title: &str) -> Vec<String> {
    vec![title.to_string(), "-".repeat(title.width()), String::new()]
}

// ── Sections ──────────────────────────────────────────────────────────────────

fn usage_over_time(table: &ResampledTable) -> Vec<String> {
    let cells = PAGE_WIDTH - LABEL_WIDTH - 1;
    let mut lines = section_title("Power Usage Over Time");
    for (name, values) in table.table.iter_columns() {
        let points = downsample(values, cells);
        let max = points.iter().copied().fold(0.0_f64, f64::max);
        let spark: String = points.iter().map(|&v| glyph(&SPARK_GLYPHS, v, max)).collect();
        lines.push(format!("{} {}", fit(name, LABEL_WIDTH), spark));
    }
    if let (Some(&first), Some(&last)) = (table.index().first(), table.index().last()) {
        lines.push(format!(
            "{} {} .. {}",
            " ".repeat(LABEL_WIDTH),
            format_bucket(first, table.granularity),
            format_bucket(last, table.granularity)
        ));
    }
    lines.push(String::new());
    lines
}

fn top_consumer_bars(table: &ResampledTable) -> Vec<String> {
    let mut lines = section_title("Top 10 Energy Consumers");
    let top = top_consumers(table, TOP_CONSUMERS);
    let max = top.first().map(|(_, v)| *v).unwrap_or(0.0);
    let overall: f64 = table.table.column_totals().iter().map(|(_, v)| v).sum();
    for (name, total) in &top {
        let len = if max > 0.0 {
            ((total / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        lines.push(format!(
            "{} {}{} {} ({}%)",
            fit(name, LABEL_WIDTH),
            "█".repeat(len),
            " ".repeat(BAR_WIDTH - len.min(BAR_WIDTH)),
            format_energy(*total),
            format_number(percentage(*total, overall, 1), 1)
        ));
    }
    lines.push(String::new());
    lines
}

fn heatmap(table: &ResampledTable) -> Vec<String> {
    let cells = PAGE_WIDTH - LABEL_WIDTH - 1;
    let mut lines = section_title("Usage Heatmap");
    let rows: Vec<(&str, Vec<f64>)> = table
        .table
        .iter_columns()
        .map(|(name, values)| (name, downsample(values, cells)))
        .collect();
    let max = rows
        .iter()
        .flat_map(|(_, v)| v.iter().copied())
        .fold(0.0_f64, f64::max);
    for (name, values) in &rows {
        let strip: String = values.iter().map(|&v| glyph(&HEAT_GLYPHS, v, max)).collect();
        lines.push(format!("{} {}", fit(name, LABEL_WIDTH), strip));
    }
    lines.push(format!(
        "{} scale: '{}' none .. '{}' {}",
        " ".repeat(LABEL_WIDTH),
        HEAT_GLYPHS[1],
        HEAT_GLYPHS[HEAT_GLYPHS.len() - 1],
        format_energy(max)
    ));
    lines.push(String::new());
    lines
}

fn quick_stats(table: &ResampledTable, selection: &[String]) -> Vec<String> {
    let mut lines = section_title("Quick Stats");
    if let Some((name, total)) = top_consumers(table, 1).into_iter().next() {
        lines.push(format!("Top Appliance:       {} ({})", name, format_energy(total)));
    }
    lines.push(format!("Selected Appliances: {}", selection.join(", ")));
    if let (Some(&first), Some(&last)) = (table.index().first(), table.index().last()) {
        lines.push(format!(
            "Timeframe:           {} to {}",
            first.date(),
            last.date()
        ));
    }
    lines.push(String::new());
    lines
}

fn summary_statistics(outcome: &FilterOutcome) -> Vec<String> {
    const COL: usize = 10;
    let mut lines = section_title("Summary Statistics");
    let header: String = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"]
        .iter()
        .map(|h| right(h, COL))
        .collect();
    lines.push(format!("{}{}", fit("Appliance", LABEL_WIDTH), header));
    for stats in &outcome.stats {
        let values: String = [
            stats.mean,
            stats.std,
            stats.min,
            stats.q25,
            stats.median,
            stats.q75,
            stats.max,
        ]
        .iter()
        .map(|&v| right(&format!("{:.2}", v), COL))
        .collect();
        lines.push(format!(
            "{}{}{}",
            fit(&stats.name, LABEL_WIDTH),
            right(&stats.count.to_string(), COL),
            values
        ));
    }
    lines.push(String::new());
    lines
}

fn anomaly_summary(outcome: &FilterOutcome) -> Vec<String> {
    if outcome.anomalies.is_empty() {
        return Vec::new();
    }
    let mut lines = section_title("Anomaly Summary");
    for (name, count) in outcome.anomalies.counts() {
        lines.push(format!("- {}: {} anomalies", name, count));
    }
    lines
}

// ── Pagination ────────────────────────────────────────────────────────────────

fn page_header(generated: NaiveDateTime) -> Vec<String> {
    vec![
        REPORT_TITLE.to_string(),
        format!("Generated: {}", generated.format("%Y-%m-%d %H:%M:%S")),
        "=".repeat(PAGE_WIDTH),
        String::new(),
    ]
}

/// Lay `sections` out on pages of [`PAGE_HEIGHT`] lines.
fn paginate(sections: Vec<Vec<String>>, generated: NaiveDateTime) -> Vec<Vec<String>> {
    let header = page_header(generated);
    let body = PAGE_HEIGHT - header.len();

    let mut pages: Vec<Vec<String>> = Vec::new();
    let mut current = header.clone();

    for section in sections.into_iter().filter(|s| !s.is_empty()) {
        let room = PAGE_HEIGHT - current.len();
        if section.len() > room && section.len() <= body && current.len() > header.len() {
            pages.push(std::mem::replace(&mut current, header.clone()));
        }
        for line in section {
            if current.len() == PAGE_HEIGHT {
                pages.push(std::mem::replace(&mut current, header.clone()));
            }
            current.push(line);
        }
    }
    pages.push(current);

    for page in &mut pages {
        page.resize(PAGE_HEIGHT, String::new());
    }
    pages
}

/// Render the full report for one filter result.
pub fn render_report(
    outcome: &FilterOutcome,
    selection: &[String],
    generated: NaiveDateTime,
) -> String {
    let table = &outcome.resampled;
    let sections = vec![
        usage_over_time(table),
        top_consumer_bars(table),
        heatmap(table),
        quick_stats(table, selection),
        summary_statistics(outcome),
        anomaly_summary(outcome),
    ];

    paginate(sections, generated)
        .into_iter()
        .map(|page| {
            let mut text = page
                .iter()
                .map(|line| line.trim_end())
                .collect::<Vec<_>>()
                .join("\n");
            text.push('\n');
            text
        })
        .collect::<Vec<_>>()
        .join(&FORM_FEED.to_string())
}

/// Render the report and write it to `path` atomically.
///
/// The text goes to a temporary file in the destination directory first and
/// is renamed over `path` once complete.
pub fn write_report(path: &Path, outcome: &FilterOutcome, selection: &[String]) -> Result<PathBuf> {
    let text = render_report(outcome, selection, Local::now().naive_local());

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path)
        .map_err(|e| MeterError::Report(format!("could not write {}: {}", path.display(), e)))?;

    tracing::info!("Report written to {}", path.display());
    Ok(path.to_path_buf())
}
