mod bootstrap;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use meter_core::models::FilterSpec;
use meter_core::settings::Settings;
use meter_runtime::session::DashboardSession;
use meter_ui::app::App;
use meter_ui::dashboard_view::{render_plain, DashboardViewData};
use meter_ui::report::{self, DEFAULT_REPORT_FILE};
use meter_ui::themes::Theme;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    let log_file = bootstrap::log_destination(&settings.view, settings.log_file.as_ref());
    bootstrap::setup_logging(&settings.log_level, log_file.as_ref())?;

    tracing::info!("Energy Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Data: {}, View: {}, Theme: {}",
        settings.data_dir.display(),
        settings.view,
        settings.theme
    );

    let mut session = DashboardSession::new(
        settings.data_dir.clone(),
        settings.aggregate.clone(),
        settings.threshold,
    );
    let data = session
        .load()
        .with_context(|| format!("loading {}", settings.data_dir.display()))?;
    for warning in &data.warnings {
        tracing::warn!("{}", warning);
    }

    let default = session.default_filter(settings.all_appliances)?;
    let spec = resolve_filter(default, &settings)?;

    match settings.view.as_str() {
        "summary" => {
            let outcome = match session.apply_filter(spec) {
                Ok(outcome) => outcome,
                Err(e) if e.is_filter_error() => match data.table.date_range() {
                    Some((first, last)) => {
                        bail!("{}; readings are available from {} to {}", e, first, last)
                    }
                    None => bail!("{}", e),
                },
                Err(e) => return Err(e.into()),
            };
            let view = DashboardViewData {
                data_dir: settings.data_dir.display().to_string(),
                available: data.table.date_range(),
                outcome,
                threshold: settings.threshold,
                warnings: data.warnings.iter().map(ToString::to_string).collect(),
            };
            print!("{}", render_plain(&view, &Theme::from_name(&settings.theme)));
            if let Some(path) = &settings.report {
                let selection = view.outcome.resampled.columns().to_vec();
                let written = report::write_report(path, &view.outcome, &selection)?;
                println!("Report written to {}", written.display());
            }
        }
        "dashboard" => {
            let report_path = settings
                .report
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_FILE));
            App::new(&settings.theme, session, spec, report_path).run()?;
        }
        unknown => bail!("unknown view mode: {}", unknown),
    }

    Ok(())
}

/// Apply `--start`, `--end` and `--appliance` on top of the default request.
///
/// Without a default (no readings at all) both dates and at least one
/// appliance must come from the command line.
fn resolve_filter(default: Option<FilterSpec>, settings: &Settings) -> Result<FilterSpec> {
    let mut spec = match default {
        Some(spec) => spec,
        None => match (settings.start, settings.end) {
            (Some(start), Some(end)) => FilterSpec::new(start, end, Vec::new()),
            _ => bail!(
                "{} has no readings; pass --start and --end explicitly",
                settings.data_dir.display()
            ),
        },
    };

    if let Some(start) = settings.start {
        spec.start = start;
    }
    if let Some(end) = settings.end {
        spec.end = end;
    }
    if !settings.appliances.is_empty() {
        spec.appliances = settings.appliances.clone();
    }
    Ok(spec)
}
