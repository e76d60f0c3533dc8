//! Dashboard tab: header, headline metrics, anomalies and the usage chart.

use chrono::NaiveDate;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use meter_core::formatting::format_number;
use meter_core::models::ResampledTable;
use meter_core::time_utils::{datetime_to_epoch, format_bucket};
use meter_data::analysis::FilterOutcome;

use crate::components::header::Header;
use crate::components::metrics::{AnomalyList, MetricsPanel};
use crate::themes::Theme;

/// Everything the dashboard and data tabs display.
#[derive(Debug, Clone)]
pub struct DashboardViewData {
    pub data_dir: String,
    /// First and last date present in the loaded data.
    pub available: Option<(NaiveDate, NaiveDate)>,
    pub outcome: FilterOutcome,
    pub threshold: f64,
    /// Channel load warnings, already formatted.
    pub warnings: Vec<String>,
}

/// Render the dashboard tab into `area`.
pub fn render_dashboard(frame: &mut Frame, area: Rect, data: &DashboardViewData, theme: &Theme) {
    let resampled = &data.outcome.resampled;
    if resampled.is_empty() {
        render_no_data(frame, area, "No buckets in the selected range", theme);
        return;
    }
    let metrics = MetricsPanel::new(&data.outcome.summary, theme).to_lines();
    let mut anomalies = AnomalyList::new(
        &data.outcome.anomalies,
        resampled.granularity,
        data.threshold,
        theme,
    )
    .to_lines();
    if !data.warnings.is_empty() {
        anomalies.push(Line::from(Span::styled(
            format!("{} channel(s) loaded with warnings", data.warnings.len()),
            theme.warning,
        )));
    }

    let [header_area, metrics_area, anomaly_area, chart_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(metrics.len() as u16 + 2),
        Constraint::Length(anomalies.len().min(6) as u16 + 2),
        Constraint::Min(8),
    ])
    .areas(area);

    let header = Header::new(
        &data.data_dir,
        data.available,
        resampled.granularity.label(),
        theme,
    );
    frame.render_widget(Paragraph::new(Text::from(header.to_lines())), header_area);

    frame.render_widget(
        Paragraph::new(Text::from(metrics))
            .block(Block::default().borders(Borders::ALL).title(" Metrics ")),
        metrics_area,
    );

    frame.render_widget(
        Paragraph::new(Text::from(anomalies))
            .block(Block::default().borders(Borders::ALL).title(" Anomalies ")),
        anomaly_area,
    );

    render_usage_chart(frame, chart_area, resampled, theme);
}

/// `(x, y)` points per column over the buckets with any consumption.
///
/// `x` is epoch seconds of the bucket start.
pub fn chart_series(table: &ResampledTable) -> Vec<(String, Vec<(f64, f64)>)> {
    let shown = table.table.nonzero_rows();
    let xs: Vec<f64> = shown
        .index()
        .iter()
        .map(|&ts| datetime_to_epoch(ts) as f64)
        .collect();
    shown
        .iter_columns()
        .map(|(name, values)| {
            let points = xs.iter().copied().zip(values.iter().copied()).collect();
            (name.to_string(), points)
        })
        .collect()
}

fn render_usage_chart(frame: &mut Frame, area: Rect, table: &ResampledTable, theme: &Theme) {
    let series = chart_series(table);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Power Usage Over Time ({}) ", table.granularity.label()));

    let (Some(&first), Some(&last)) = (table.index().first(), table.index().last()) else {
        frame.render_widget(
            Paragraph::new(Span::styled("No buckets in range", theme.dim)).block(block),
            area,
        );
        return;
    };

    let x_min = datetime_to_epoch(first) as f64;
    let x_max = (datetime_to_epoch(last) as f64).max(x_min + 1.0);
    let y_max = series
        .iter()
        .flat_map(|(_, points)| points.iter().map(|&(_, y)| y))
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, (name, points))| {
            Dataset::default()
                .name(name.clone())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(theme.series_style(i))
                .data(points)
        })
        .collect();

    let x_labels = vec![
        format_bucket(first, table.granularity),
        format_bucket(last, table.granularity),
    ];
    let y_labels = vec![
        "0".to_string(),
        format_number(y_max / 2.0, 0),
        format_number(y_max, 0),
    ];

    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(theme.axis)
                .bounds([x_min, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("VAh")
                .style(theme.axis)
                .bounds([0.0, y_max])
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}

/// The dashboard as plain text, for non-interactive output.
pub fn render_plain(data: &DashboardViewData, theme: &Theme) -> String {
    let resampled = &data.outcome.resampled;
    let header = Header::new(
        &data.data_dir,
        data.available,
        resampled.granularity.label(),
        theme,
    );
    let anomalies = AnomalyList::new(
        &data.outcome.anomalies,
        resampled.granularity,
        data.threshold,
        theme,
    );

    let mut lines = header.to_lines();
    lines.push(Line::from(format!(
        "Selection: {} ({} to {})",
        resampled.columns().join(", "),
        resampled.start,
        resampled.end
    )));
    lines.push(Line::from(""));
    lines.extend(MetricsPanel::new(&data.outcome.summary, theme).to_lines());
    lines.push(Line::from(""));
    lines.extend(anomalies.to_lines());
    lines.extend(data.warnings.iter().map(|w| Line::from(w.as_str())));

    let mut out = lines
        .iter()
        .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}

/// Placeholder shown when no filter result is available.
pub fn render_no_data(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No data to display", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), theme.dim)),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Energy Dashboard "),
        ),
        area,
    );
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, NaiveDateTime};
    use meter_core::models::{Anomaly, AnomalyReport, Granularity, TimeTable, UsageSummary};
    use meter_core::stats::ColumnStats;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn hour(h: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2011, 4, 18)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(h)
    }

    pub(crate) fn make_view_data() -> DashboardViewData {
        let mut fridge = vec![1.0; 24];
        fridge[13] = 50.0;
        let aggregate: Vec<f64> = (0..24).map(|h| 100.0 + h as f64).collect();
        let table = TimeTable::new(
            vec!["aggregate".into(), "fridge".into()],
            (0..24).map(hour).collect(),
            vec![aggregate.clone(), fridge.clone()],
        );
        let day = hour(0).date();
        let mut anomalies = AnomalyReport::new();
        anomalies.push(
            "fridge",
            vec![Anomaly {
                timestamp: hour(13),
                value: 50.0,
                zscore: 4.8,
            }],
        );
        DashboardViewData {
            data_dir: "cleaned_house1".into(),
            available: Some((day, day)),
            outcome: FilterOutcome {
                resampled: ResampledTable {
                    granularity: Granularity::Hourly,
                    start: day,
                    end: day,
                    table,
                },
                anomalies,
                stats: vec![
                    ColumnStats::describe("aggregate", &aggregate),
                    ColumnStats::describe("fridge", &fridge),
                ],
                summary: UsageSummary {
                    total_consumption: 73.0,
                    average_per_appliance: Some(73.0 / 24.0),
                    top_consumer: Some(("fridge".into(), 73.0)),
                },
            },
            threshold: 3.0,
            warnings: vec!["Could not fully load oven (channel 3): file contains no readings".into()],
        }
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_chart_series_skips_empty_buckets() {
        let mut data = make_view_data();
        data.outcome.resampled.table = TimeTable::new(
            vec!["a".into(), "b".into()],
            vec![hour(0), hour(1), hour(2)],
            vec![vec![1.0, 0.0, 2.0], vec![0.0, 0.0, 3.0]],
        );
        let series = chart_series(&data.outcome.resampled);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].1.len(), 2);
        assert_eq!(series[1].1[1].1, 3.0);
    }

    #[test]
    fn test_render_dashboard_shows_metrics() {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::dark();
        let data = make_view_data();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_dashboard(frame, area, &data, &theme);
            })
            .unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Total Consumption"));
        assert!(text.contains("fridge: 1 anomalies"));
        assert!(text.contains("Power Usage Over Time"));
    }

    #[test]
    fn test_render_dashboard_small_terminal_does_not_panic() {
        let backend = TestBackend::new(40, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::light();
        let data = make_view_data();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_dashboard(frame, area, &data, &theme);
            })
            .unwrap();
    }

    #[test]
    fn test_render_plain_summary() {
        let data = make_view_data();
        let text = render_plain(&data, &Theme::dark());
        assert!(text.starts_with(crate::components::header::TITLE));
        assert!(text.contains("Selection: aggregate, fridge (2011-04-18 to 2011-04-18)"));
        assert!(text.contains("Highest Consumer:      fridge with 73.00 VAh"));
        assert!(text.contains("fridge: 1 anomalies"));
        assert!(text.contains("Could not fully load oven"));
    }

    #[test]
    fn test_render_dashboard_empty_range_shows_placeholder() {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        let theme = Theme::dark();
        let mut data = make_view_data();
        data.outcome.resampled.table =
            TimeTable::new(vec!["aggregate".into()], vec![], vec![vec![]]);

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_dashboard(frame, area, &data, &theme);
            })
            .unwrap();

        assert!(buffer_text(&terminal).contains("No data to display"));
    }
}
