use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file name used by the dashboard view.
pub const DEFAULT_LOG_FILE: &str = "energy-dashboard.log";

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Application directory under the user's home.
pub fn app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".energy-dashboard")
}

/// Ensure `~/.energy-dashboard/` and its `logs/` subdirectory exist.
pub fn ensure_directories() -> anyhow::Result<()> {
    let dir = app_dir();
    std::fs::create_dir_all(&dir)?;
    std::fs::create_dir_all(dir.join("logs"))?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name (`DEBUG`, `INFO`, `WARNING`, `ERROR`) to an
/// [`EnvFilter`] directive. Unknown names pass through unchanged.
pub fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Where log output goes for `view`.
///
/// An explicit `--log-file` always wins. The dashboard owns the terminal, so
/// without one it logs to `~/.energy-dashboard/logs/energy-dashboard.log`;
/// other views log to stderr (`None`).
pub fn log_destination(view: &str, log_file: Option<&PathBuf>) -> Option<PathBuf> {
    match log_file {
        Some(path) => Some(path.clone()),
        None if view == "dashboard" => Some(app_dir().join("logs").join(DEFAULT_LOG_FILE)),
        None => None,
    }
}

/// Open `path` for appending, creating it and its parent directories.
pub fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialise the global `tracing` subscriber.
///
/// Output goes to stderr, or to `log_file` without ANSI colours when one is
/// given. An unrecognised level falls back to `info`.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let (stderr_layer, file_layer) = match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (None, Some(layer))
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            (Some(layer), None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
