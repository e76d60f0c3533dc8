use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::DEFAULT_AGGREGATE;
use crate::stats::DEFAULT_ZSCORE_THRESHOLD;

/// Data directory used when neither the CLI nor the last run names one.
pub const DEFAULT_DATA_DIR: &str = "cleaned_house1";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Household energy meter dashboard
#[derive(Parser, Debug, Clone)]
#[command(
    name = "energy-dashboard",
    about = "Explore per-channel household energy readings and flag outliers",
    version
)]
pub struct Settings {
    /// Directory holding labels.dat and channel_<id>.dat files
    #[arg(long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// First day to include (YYYY-MM-DD); defaults to the first available day
    #[arg(long, value_parser = parse_date_arg)]
    pub start: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD); defaults to the last available day
    #[arg(long, value_parser = parse_date_arg)]
    pub end: Option<NaiveDate>,

    /// Appliance to show (repeatable)
    #[arg(long = "appliance")]
    pub appliances: Vec<String>,

    /// Select every loaded appliance
    #[arg(long)]
    pub all_appliances: bool,

    /// Name of the whole-house channel
    #[arg(long, default_value = DEFAULT_AGGREGATE)]
    pub aggregate: String,

    /// Z-score magnitude above which a bucket is flagged
    #[arg(long, default_value_t = DEFAULT_ZSCORE_THRESHOLD, value_parser = parse_threshold_arg)]
    pub threshold: f64,

    /// View mode
    #[arg(long, default_value = "dashboard", value_parser = ["dashboard", "summary"])]
    pub view: String,

    /// Write the visual report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    crate::time_utils::parse_date(s).map_err(|e| e.to_string())
}

fn parse_threshold_arg(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("threshold must be a positive number, got {}", s));
    }
    Ok(value)
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.energy-dashboard/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,
}

impl LastUsedParams {
    /// Default location of the persisted parameters.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// The config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".energy-dashboard").join("last_used.json")
    }

    /// Load persisted params; `Default` when the file is absent or unparseable.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("ignoring unreadable {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at `path` if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, fill unset options from the last run and persist
    /// the result for the next one.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with explicit arguments and
    /// config path.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("could not clear {}: {}", config_path.display(), e);
            }
            return settings.resolve();
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over the persisted value.
        if !is_arg_explicitly_set(&matches, "data_dir") {
            if let Some(v) = last.data_dir {
                settings.data_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "view") {
            if let Some(v) = last.view {
                settings.view = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "aggregate") {
            if let Some(v) = last.aggregate {
                settings.aggregate = v;
            }
        }

        settings = settings.resolve();

        if let Err(e) = LastUsedParams::from(&settings).save_to(config_path) {
            tracing::warn!("could not persist settings: {}", e);
        }

        settings
    }

    /// Apply `--debug`.
    fn resolve(mut self) -> Self {
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }
}

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_dir: Some(s.data_dir.clone()),
            view: Some(s.view.clone()),
            theme: Some(s.theme.clone()),
            aggregate: Some(s.aggregate.clone()),
        }
    }
}

/// `true` when `name` was supplied on the command line rather than by a
/// default value.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            data_dir: Some(PathBuf::from("/data/house2")),
            view: Some("summary".to_string()),
            theme: Some("dark".to_string()),
            aggregate: Some("mains".to_string()),
        };

        params.save_to(&path).expect("save");
        assert_eq!(LastUsedParams::load_from(&path), params);
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_last_used_params_default_when_missing_or_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["energy-dashboard"]);

        assert_eq!(settings.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert!(settings.start.is_none());
        assert!(settings.end.is_none());
        assert!(settings.appliances.is_empty());
        assert!(!settings.all_appliances);
        assert_eq!(settings.aggregate, "aggregate");
        assert!((settings.threshold - 3.0).abs() < f64::EPSILON);
        assert_eq!(settings.view, "dashboard");
        assert!(settings.report.is_none());
        assert_eq!(settings.theme, "auto");
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_cli_filter_args() {
        let settings = Settings::parse_from([
            "energy-dashboard",
            "--start",
            "2011-04-18",
            "--end",
            "2011-04-20",
            "--appliance",
            "aggregate",
            "--appliance",
            "kitchen outlets",
        ]);
        assert_eq!(settings.start, NaiveDate::from_ymd_opt(2011, 4, 18));
        assert_eq!(settings.end, NaiveDate::from_ymd_opt(2011, 4, 20));
        assert_eq!(settings.appliances, vec!["aggregate", "kitchen outlets"]);
    }

    #[test]
    fn test_settings_rejects_bad_date() {
        let result = Settings::try_parse_from(["energy-dashboard", "--start", "18/04/2011"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_threshold_must_be_positive() {
        let settings = Settings::parse_from(["energy-dashboard", "--threshold", "2.5"]);
        assert!((settings.threshold - 2.5).abs() < f64::EPSILON);

        for bad in ["-1", "0", "NaN", "inf", "abc"] {
            let arg = format!("--threshold={}", bad);
            let result = Settings::try_parse_from(["energy-dashboard", arg.as_str()]);
            assert!(result.is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_load_with_last_used_merges_persisted_values() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            data_dir: Some(PathBuf::from("/data/house3")),
            theme: Some("light".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(vec!["energy-dashboard".into()], &config_path);
        assert_eq!(settings.data_dir, PathBuf::from("/data/house3"));
        assert_eq!(settings.theme, "light");
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            data_dir: Some(PathBuf::from("/data/house3")),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec![
                "energy-dashboard".into(),
                "--data-dir".into(),
                "/data/house1".into(),
            ],
            &config_path,
        );
        assert_eq!(settings.data_dir, PathBuf::from("/data/house1"));
        assert_eq!(
            LastUsedParams::load_from(&config_path).data_dir,
            Some(PathBuf::from("/data/house1"))
        );
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&config_path).expect("save");

        Settings::load_with_last_used_impl(
            vec!["energy-dashboard".into(), "--clear".into()],
            &config_path,
        );

        assert!(!config_path.exists());
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_with_last_used_impl(
            vec!["energy-dashboard".into(), "--debug".into()],
            &tmp_config_path(&tmp),
        );
        assert_eq!(settings.log_level, "DEBUG");
    }
}
