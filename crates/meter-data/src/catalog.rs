//! `labels.dat` parsing.
//!
//! The catalog is all-or-nothing: one malformed line fails the whole load so
//! that a partial catalog never silently drops channels.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use meter_core::error::{MeterError, Result};
use meter_core::models::ChannelCatalog;
use tracing::{debug, warn};

/// File name of the channel catalog inside a data directory.
pub const CATALOG_FILE: &str = "labels.dat";

/// Path of the catalog inside `data_dir`.
pub fn catalog_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CATALOG_FILE)
}

/// Read and parse `<data_dir>/labels.dat`.
pub fn load_catalog(data_dir: &Path) -> Result<ChannelCatalog> {
    let path = catalog_path(data_dir);
    if !path.is_file() {
        return Err(MeterError::MissingCatalog(path));
    }

    let file = std::fs::File::open(&path).map_err(|source| MeterError::FileRead {
        path: path.clone(),
        source,
    })?;
    let catalog = parse_catalog(std::io::BufReader::new(file)).map_err(|e| match e {
        MeterError::Io(source) => MeterError::FileRead {
            path: path.clone(),
            source,
        },
        other => other,
    })?;

    debug!(
        "Loaded {} catalog entries from {}",
        catalog.len(),
        path.display()
    );
    Ok(catalog)
}

/// Parse catalog lines of the form `<channel_id> <appliance name>`.
///
/// Only the first space separates id from name. Blank lines are skipped;
/// a repeated id overwrites the earlier name in place.
pub fn parse_catalog<R: BufRead>(reader: R) -> Result<ChannelCatalog> {
    let mut catalog = ChannelCatalog::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (id, name) = parse_entry(trimmed).ok_or_else(|| MeterError::MalformedCatalogEntry {
            line: idx + 1,
            content: trimmed.to_string(),
        })?;

        if let Some(previous) = catalog.insert(id, name) {
            warn!(
                "channel {} listed twice in catalog; {:?} replaces {:?}",
                id, name, previous
            );
        }
    }

    Ok(catalog)
}

fn parse_entry(line: &str) -> Option<(u32, &str)> {
    let (id, name) = line.split_once(' ')?;
    let id: u32 = id.parse().ok().filter(|&id| id > 0)?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((id, name))
}
