use meter_core::formatting::{format_energy, format_number};
use meter_core::models::{AnomalyReport, Granularity, UsageSummary};
use meter_core::time_utils::format_bucket;
use ratatui::text::{Line, Span};

use crate::themes::Theme;

/// Headline consumption figures.
///
/// Lines that do not apply to the current selection are omitted, so a lone
/// aggregate column shows only its total.
pub struct MetricsPanel<'a> {
    pub summary: &'a UsageSummary,
    pub theme: &'a Theme,
}

impl<'a> MetricsPanel<'a> {
    pub fn new(summary: &'a UsageSummary, theme: &'a Theme) -> Self {
        Self { summary, theme }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let mut lines = vec![Line::from(vec![
            Span::styled("Total Consumption:     ", self.theme.label),
            Span::styled(
                format_energy(self.summary.total_consumption),
                self.theme.value,
            ),
        ])];

        if let Some(avg) = self.summary.average_per_appliance {
            lines.push(Line::from(vec![
                Span::styled("Average per Appliance: ", self.theme.label),
                Span::styled(format_energy(avg), self.theme.value),
            ]));
        }

        if let Some((name, total)) = &self.summary.top_consumer {
            lines.push(Line::from(vec![
                Span::styled("Highest Consumer:      ", self.theme.label),
                Span::styled(name.clone(), self.theme.success),
                Span::styled(" with ", self.theme.label),
                Span::styled(format_energy(*total), self.theme.success),
            ]));
        }

        lines
    }
}

/// One line per appliance with anomalous buckets, largest |z| first.
pub struct AnomalyList<'a> {
    pub report: &'a AnomalyReport,
    pub granularity: Granularity,
    pub threshold: f64,
    pub theme: &'a Theme,
}

impl<'a> AnomalyList<'a> {
    pub fn new(
        report: &'a AnomalyReport,
        granularity: Granularity,
        threshold: f64,
        theme: &'a Theme,
    ) -> Self {
        Self {
            report,
            granularity,
            threshold,
            theme,
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        if self.report.is_empty() {
            return vec![Line::from(Span::styled(
                format!(
                    "No anomalies beyond ±{} standard deviations",
                    format_number(self.threshold, 1)
                ),
                self.theme.success,
            ))];
        }

        self.report
            .iter()
            .map(|(name, anomalies)| {
                let worst = anomalies
                    .iter()
                    .max_by(|a, b| a.zscore.abs().total_cmp(&b.zscore.abs()));
                let mut spans = vec![
                    Span::styled(name.to_string(), self.theme.anomaly),
                    Span::styled(
                        format!(": {} anomalies", anomalies.len()),
                        self.theme.text,
                    ),
                ];
                if let Some(worst) = worst {
                    spans.push(Span::styled(
                        format!(
                            " (peak {} at {}, z = {})",
                            format_energy(worst.value),
                            format_bucket(worst.timestamp, self.granularity),
                            format_number(worst.zscore, 2)
                        ),
                        self.theme.dim,
                    ));
                }
                Line::from(spans)
            })
            .collect()
    }
}
