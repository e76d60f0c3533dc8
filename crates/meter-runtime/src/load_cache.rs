//! Signature-keyed cache around the load pipeline.
//!
//! Loading a house directory is the expensive step of the dashboard, so the
//! result is kept until the directory's input files change. The key is the
//! canonical directory path plus a [`DirSignature`] (name, length and mtime
//! of `labels.dat` and every `channel_<id>.dat`). Any difference reloads.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant, SystemTime};

use meter_core::error::Result;
use meter_data::analysis::{load_house_data, LoadedData};
use meter_data::catalog::CATALOG_FILE;
use regex::Regex;

// ── DirSignature ──────────────────────────────────────────────────────────────

/// Identity of one input file at the time it was seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    pub name: String,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

/// Stamps of every input file in a directory, sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirSignature {
    pub files: Vec<FileStamp>,
}

fn channel_file_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^channel_\d+\.dat$").expect("regex is valid"))
}

/// `true` for file names the loader reads.
pub fn is_input_file(name: &str) -> bool {
    name == CATALOG_FILE || channel_file_pattern().is_match(name)
}

/// Stamp every input file directly inside `data_dir`.
///
/// Unreadable entries are skipped; a missing directory yields an empty
/// signature, and the load itself reports the problem.
pub fn directory_signature(data_dir: &Path) -> DirSignature {
    let mut files: Vec<FileStamp> = walkdir::WalkDir::new(data_dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            if !is_input_file(&name) {
                return None;
            }
            let meta = entry.metadata().ok()?;
            Some(FileStamp {
                name,
                len: meta.len(),
                modified: meta.modified().ok(),
            })
        })
        .collect();

    files.sort_by(|a, b| a.name.cmp(&b.name));
    DirSignature { files }
}

// ── LoadCache ─────────────────────────────────────────────────────────────────

struct CacheEntry {
    dir: PathBuf,
    signature: DirSignature,
    data: Arc<LoadedData>,
    loaded_at: Instant,
}

/// Single-entry cache of the most recently loaded directory.
///
/// # Example
/// ```no_run
/// use meter_runtime::load_cache::LoadCache;
///
/// let mut cache = LoadCache::new();
/// let data = cache.get_or_load("cleaned_house1".as_ref())?;
/// println!("{} rows", data.table.len());
/// # Ok::<(), meter_runtime::core::MeterError>(())
/// ```
#[derive(Default)]
pub struct LoadCache {
    entry: Option<CacheEntry>,
    hits: u64,
    loads: u64,
}

impl LoadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the data of `data_dir`, loading it when the cache is empty,
    /// holds another directory, or the directory's signature changed.
    ///
    /// Load failures are returned as-is and leave the previous entry in
    /// place.
    pub fn get_or_load(&mut self, data_dir: &Path) -> Result<Arc<LoadedData>> {
        let dir = std::fs::canonicalize(data_dir).unwrap_or_else(|_| data_dir.to_path_buf());
        let signature = directory_signature(&dir);

        if let Some(entry) = &self.entry {
            if entry.dir == dir && entry.signature == signature {
                self.hits += 1;
                tracing::debug!("load cache hit for {}", dir.display());
                return Ok(Arc::clone(&entry.data));
            }
            tracing::debug!("load cache stale for {}", dir.display());
        }

        let data = Arc::new(load_house_data(&dir)?);
        self.loads += 1;
        self.entry = Some(CacheEntry {
            dir,
            signature,
            data: Arc::clone(&data),
            loaded_at: Instant::now(),
        });
        Ok(data)
    }

    /// Drop the cached entry so that the next call reloads.
    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            tracing::debug!("load cache invalidated");
        }
    }

    /// Time since the cached entry was loaded.
    pub fn cache_age(&self) -> Option<Duration> {
        self.entry.as_ref().map(|e| e.loaded_at.elapsed())
    }

    /// Directory of the cached entry.
    pub fn cached_dir(&self) -> Option<&Path> {
        self.entry.as_ref().map(|e| e.dir.as_path())
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of loads that actually read the directory.
    pub fn loads(&self) -> u64 {
        self.loads
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use meter_core::MeterError;
    use tempfile::TempDir;

    fn write_house(dir: &Path) {
        std::fs::write(dir.join("labels.dat"), "1 aggregate\n2 fridge\n").unwrap();
        std::fs::write(dir.join("channel_1.dat"), "1303084800 10\n1303088400 12\n").unwrap();
        std::fs::write(dir.join("channel_2.dat"), "1303084800 1\n").unwrap();
    }

    #[test]
    fn test_input_file_names() {
        assert!(is_input_file("labels.dat"));
        assert!(is_input_file("channel_12.dat"));
        assert!(!is_input_file("channel_x.dat"));
        assert!(!is_input_file("channel_1.dat.bak"));
        assert!(!is_input_file("notes.txt"));
        assert!(!is_input_file("channel_.dat"));
    }

    #[test]
    fn test_signature_lists_inputs_only() {
        let dir = TempDir::new().unwrap();
        write_house(dir.path());
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let sig = directory_signature(dir.path());
        let names: Vec<&str> = sig.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["channel_1.dat", "channel_2.dat", "labels.dat"]);
    }

    #[test]
    fn test_signature_of_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let sig = directory_signature(&dir.path().join("nope"));
        assert!(sig.files.is_empty());
    }

    #[test]
    fn test_second_call_is_a_hit() {
        let dir = TempDir::new().unwrap();
        write_house(dir.path());
        let mut cache = LoadCache::new();

        let first = cache.get_or_load(dir.path()).unwrap();
        let second = cache.get_or_load(dir.path()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.loads(), 1);
        assert_eq!(cache.hits(), 1);
        assert!(cache.cache_age().is_some());
    }

    #[test]
    fn test_changed_channel_file_reloads() {
        let dir = TempDir::new().unwrap();
        write_house(dir.path());
        let mut cache = LoadCache::new();

        let first = cache.get_or_load(dir.path()).unwrap();
        std::fs::write(
            dir.path().join("channel_2.dat"),
            "1303084800 1\n1303088400 5\n",
        )
        .unwrap();
        let second = cache.get_or_load(dir.path()).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.table.column("fridge"), Some(&[1.0, 5.0][..]));
        assert_eq!(cache.loads(), 2);
    }

    #[test]
    fn test_unrelated_file_does_not_reload() {
        let dir = TempDir::new().unwrap();
        write_house(dir.path());
        let mut cache = LoadCache::new();

        cache.get_or_load(dir.path()).unwrap();
        std::fs::write(dir.path().join("README"), "house 1").unwrap();
        cache.get_or_load(dir.path()).unwrap();
        assert_eq!(cache.loads(), 1);
    }

    #[test]
    fn test_invalidate_forces_reload() {
        let dir = TempDir::new().unwrap();
        write_house(dir.path());
        let mut cache = LoadCache::new();

        cache.get_or_load(dir.path()).unwrap();
        cache.invalidate();
        assert!(cache.cache_age().is_none());
        cache.get_or_load(dir.path()).unwrap();
        assert_eq!(cache.loads(), 2);
    }

    #[test]
    fn test_other_directory_replaces_entry() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        write_house(a.path());
        write_house(b.path());
        let mut cache = LoadCache::new();

        cache.get_or_load(a.path()).unwrap();
        cache.get_or_load(b.path()).unwrap();
        assert_eq!(cache.loads(), 2);
        assert_eq!(
            cache.cached_dir(),
            Some(std::fs::canonicalize(b.path()).unwrap().as_path())
        );
    }

    #[test]
    fn test_failed_load_keeps_previous_entry() {
        let good = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        write_house(good.path());
        let mut cache = LoadCache::new();

        cache.get_or_load(good.path()).unwrap();
        let err = cache.get_or_load(empty.path()).unwrap_err();
        assert!(matches!(err, MeterError::MissingCatalog(_)));
        assert!(cache.cached_dir().is_some());
    }
}
