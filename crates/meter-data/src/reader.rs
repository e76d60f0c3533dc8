//! Per-channel series loading.
//!
//! Each cataloged channel is read from `channel_<id>.dat`, two whitespace
//! separated columns per line: integer epoch seconds and a numeric reading.
//! Unlike the catalog, channel files fail soft: a broken file produces a
//! [`ChannelWarning`] and the channel is left out of the merge.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use meter_core::error::{MeterError, Result};
use meter_core::models::{ChannelCatalog, ChannelSeries, Reading};
use meter_core::time_utils::epoch_to_datetime;
use thiserror::Error;
use tracing::{debug, warn};

// ── Warnings ──────────────────────────────────────────────────────────────────

/// What went wrong with one channel file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelIssue {
    /// The file exists but could not be read.
    #[error("could not read file: {0}")]
    Unreadable(String),

    /// A line is not `<epoch seconds> <reading>`.
    #[error("line {line}: {reason} ({content:?})")]
    MalformedRow {
        line: usize,
        content: String,
        reason: String,
    },

    /// The file holds no readings at all.
    #[error("file contains no readings")]
    Empty,

    /// Several readings share a timestamp; the last one was kept.
    #[error("{count} duplicate timestamps collapsed, last reading kept")]
    DuplicateTimestamps { count: usize },

    /// Another channel with the same appliance name was loaded earlier and
    /// has been replaced by this one.
    #[error("replaces channel {previous} with the same name")]
    DuplicateName { previous: u32 },
}

impl ChannelIssue {
    /// `true` when the channel was dropped because of this issue.
    pub fn excludes_channel(&self) -> bool {
        matches!(
            self,
            ChannelIssue::Unreadable(_) | ChannelIssue::MalformedRow { .. } | ChannelIssue::Empty
        )
    }
}

/// A non-fatal problem attributed to one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelWarning {
    pub channel_id: u32,
    pub name: String,
    pub issue: ChannelIssue,
}

impl std::fmt::Display for ChannelWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Could not fully load {} (channel {}): {}",
            self.name, self.channel_id, self.issue
        )
    }
}

// ── LoadedChannels ────────────────────────────────────────────────────────────

/// Successfully parsed channels plus the warnings collected on the way.
#[derive(Debug, Clone, Default)]
pub struct LoadedChannels {
    /// One series per appliance name, in catalog order.
    pub series: Vec<ChannelSeries>,
    pub warnings: Vec<ChannelWarning>,
    /// Cataloged channels without a source file.
    pub missing: Vec<u32>,
}

impl LoadedChannels {
    /// Warnings that caused a channel to be dropped.
    pub fn rejected(&self) -> impl Iterator<Item = &ChannelWarning> {
        self.warnings.iter().filter(|w| w.issue.excludes_channel())
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Conventional source file of channel `id`.
pub fn channel_path(data_dir: &Path, id: u32) -> PathBuf {
    data_dir.join(format!("channel_{}.dat", id))
}

/// Load every cataloged channel that has a source file.
///
/// Fails with [`MeterError::NoChannelsLoaded`] only when nothing could be
/// loaded.
pub fn load_channels(catalog: &ChannelCatalog, data_dir: &Path) -> Result<LoadedChannels> {
    let mut loaded = LoadedChannels::default();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for (id, name) in catalog.iter() {
        let path = channel_path(data_dir, id);
        if !path.is_file() {
            debug!("No source file for channel {} ({})", id, name);
            loaded.missing.push(id);
            continue;
        }

        let (series, duplicates) = match read_channel_file(&path, id, name) {
            Ok(parsed) => parsed,
            Err(issue) => {
                let warning = ChannelWarning {
                    channel_id: id,
                    name: name.to_string(),
                    issue,
                };
                warn!("{}", warning);
                loaded.warnings.push(warning);
                continue;
            }
        };

        if duplicates > 0 {
            let warning = ChannelWarning {
                channel_id: id,
                name: name.to_string(),
                issue: ChannelIssue::DuplicateTimestamps { count: duplicates },
            };
            warn!("{}", warning);
            loaded.warnings.push(warning);
        }

        debug!(
            "Channel {} ({}): {} readings from {}",
            id,
            name,
            series.len(),
            path.display()
        );

        match by_name.get(name) {
            Some(&pos) => {
                let previous = loaded.series[pos].channel_id;
                let warning = ChannelWarning {
                    channel_id: id,
                    name: name.to_string(),
                    issue: ChannelIssue::DuplicateName { previous },
                };
                warn!("{}", warning);
                loaded.warnings.push(warning);
                loaded.series[pos] = series;
            }
            None => {
                by_name.insert(name.to_string(), loaded.series.len());
                loaded.series.push(series);
            }
        }
    }

    if loaded.series.is_empty() {
        return Err(MeterError::NoChannelsLoaded(data_dir.to_path_buf()));
    }

    Ok(loaded)
}

/// Read one channel file.
///
/// Returns the series (sorted, unique timestamps) and the number of
/// readings that were collapsed because their timestamp repeated.
pub fn read_channel_file(
    path: &Path,
    channel_id: u32,
    name: &str,
) -> std::result::Result<(ChannelSeries, usize), ChannelIssue> {
    let file = std::fs::File::open(path).map_err(|e| ChannelIssue::Unreadable(e.to_string()))?;
    let reader = std::io::BufReader::new(file);

    let mut readings = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ChannelIssue::Unreadable(e.to_string()))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        readings.push(parse_row(trimmed).map_err(|reason| ChannelIssue::MalformedRow {
            line: idx + 1,
            content: trimmed.to_string(),
            reason,
        })?);
    }

    if readings.is_empty() {
        return Err(ChannelIssue::Empty);
    }

    let (readings, duplicates) = collapse_duplicates(readings);
    Ok((
        ChannelSeries {
            channel_id,
            name: name.to_string(),
            readings,
        },
        duplicates,
    ))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn parse_row(line: &str) -> std::result::Result<Reading, String> {
    let mut fields = line.split_whitespace();
    let (Some(ts), Some(value), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err("expected two columns".to_string());
    };

    let secs: i64 = ts
        .parse()
        .map_err(|_| format!("timestamp {:?} is not an integer", ts))?;
    let timestamp =
        epoch_to_datetime(secs).ok_or_else(|| format!("timestamp {} out of range", secs))?;

    let value: f64 = value
        .parse()
        .map_err(|_| format!("reading {:?} is not a number", value))?;
    if !value.is_finite() {
        return Err(format!("reading {:?} is not a finite number", value));
    }

    Ok(Reading { timestamp, value })
}

/// Sort by timestamp and keep the last reading (in file order) of every
/// repeated timestamp.
fn collapse_duplicates(mut readings: Vec<Reading>) -> (Vec<Reading>, usize) {
    readings.sort_by_key(|r| r.timestamp);

    let mut out: Vec<Reading> = Vec::with_capacity(readings.len());
    let mut duplicates = 0usize;
    for reading in readings {
        match out.last_mut() {
            Some(last) if last.timestamp == reading.timestamp => {
                *last = reading;
                duplicates += 1;
            }
            _ => out.push(reading),
        }
    }
    (out, duplicates)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
