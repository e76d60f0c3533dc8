use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the energy dashboard pipeline.
///
/// Catalog and load failures are fatal for the whole pipeline; the filter
/// variants only abort the current filter request. Per-channel parse problems
/// are not errors at all: they are collected as warnings by the series loader.
#[derive(Error, Debug)]
pub enum MeterError {
    /// The data directory has no `labels.dat`.
    #[error("Channel catalog not found: {0}")]
    MissingCatalog(PathBuf),

    /// A line of `labels.dat` is not `<positive id> <name>`.
    #[error("Malformed catalog entry on line {line}: {content:?}")]
    MalformedCatalogEntry { line: usize, content: String },

    /// Every cataloged channel was either missing or unparseable.
    #[error("No valid channel files were loaded from {0}")]
    NoChannelsLoaded(PathBuf),

    /// The requested start date lies after the end date.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// No appliance was selected.
    #[error("Please select at least one appliance")]
    EmptySelection,

    /// A selected appliance is not a column of the loaded table.
    #[error("Unknown appliance: {0}")]
    UnknownAppliance(String),

    /// The date range contains no readings.
    #[error("No data available between {start} and {end}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report document could not be written.
    #[error("Report error: {0}")]
    Report(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MeterError {
    /// `true` for errors that only invalidate the current filter request.
    ///
    /// Callers keep the loaded table and ask for new parameters.
    pub fn is_filter_error(&self) -> bool {
        matches!(
            self,
            MeterError::InvalidDateRange { .. }
                | MeterError::EmptySelection
                | MeterError::UnknownAppliance(_)
                | MeterError::EmptyRange { .. }
        )
    }
}

/// Convenience alias used throughout the meter crates.
pub type Result<T> = std::result::Result<T, MeterError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_error_display_missing_catalog() {
        let err = MeterError::MissingCatalog(PathBuf::from("/data/house1/labels.dat"));
        assert_eq!(
            err.to_string(),
            "Channel catalog not found: /data/house1/labels.dat"
        );
    }

    #[test]
    fn test_error_display_malformed_entry() {
        let err = MeterError::MalformedCatalogEntry {
            line: 3,
            content: "x kitchen".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("line 3"));
        assert!(msg.contains("x kitchen"));
    }

    #[test]
    fn test_error_display_invalid_range() {
        let err = MeterError::InvalidDateRange {
            start: date(2013, 5, 2),
            end: date(2013, 5, 1),
        };
        assert_eq!(
            err.to_string(),
            "Invalid date range: 2013-05-02 is after 2013-05-01"
        );
    }

    #[test]
    fn test_error_display_empty_range() {
        let err = MeterError::EmptyRange {
            start: date(2014, 1, 1),
            end: date(2014, 1, 3),
        };
        assert_eq!(
            err.to_string(),
            "No data available between 2014-01-01 and 2014-01-03"
        );
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = MeterError::FileRead {
            path: PathBuf::from("/data/channel_1.dat"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/channel_1.dat"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_filter_errors_classified() {
        assert!(MeterError::EmptySelection.is_filter_error());
        assert!(MeterError::UnknownAppliance("kettle".into()).is_filter_error());
        assert!(!MeterError::NoChannelsLoaded(PathBuf::from("/x")).is_filter_error());
        assert!(!MeterError::MissingCatalog(PathBuf::from("/x")).is_filter_error());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MeterError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }
}
