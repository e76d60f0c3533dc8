use meter_core::models::FilterSpec;
use ratatui::text::{Line, Span};

use crate::themes::Theme;

/// Key hints listed under the appliance checklist.
pub const FILTER_KEYS: [&str; 4] = [
    "[ ] start -/+ 1 day",
    "{ } end -/+ 1 day",
    "Up/Down, Space: toggle",
    "a: all appliances",
];

/// The pending filter request: date bounds plus an appliance checklist.
pub struct FilterPanel<'a> {
    pub spec: &'a FilterSpec,
    /// Every loaded column, in table order.
    pub columns: &'a [String],
    pub cursor: usize,
    pub theme: &'a Theme,
}

impl<'a> FilterPanel<'a> {
    pub fn new(spec: &'a FilterSpec, columns: &'a [String], cursor: usize, theme: &'a Theme) -> Self {
        Self {
            spec,
            columns,
            cursor,
            theme,
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let mut lines = vec![
            Line::from(vec![
                Span::styled("Start: ", self.theme.label),
                Span::styled(self.spec.start.to_string(), self.theme.value),
            ]),
            Line::from(vec![
                Span::styled("End:   ", self.theme.label),
                Span::styled(self.spec.end.to_string(), self.theme.value),
            ]),
            Line::from(""),
            Line::from(Span::styled("Appliances", self.theme.label)),
        ];

        for (i, name) in self.columns.iter().enumerate() {
            let checked = self.spec.appliances.iter().any(|a| a == name);
            let marker = if i == self.cursor { "> " } else { "  " };
            let check = if checked { "[x] " } else { "[ ] " };
            let style = if i == self.cursor {
                self.theme.tab_active
            } else if checked {
                self.theme.text
            } else {
                self.theme.dim
            };
            lines.push(Line::from(Span::styled(
                format!("{}{}{}", marker, check, name),
                style,
            )));
        }

        lines.push(Line::from(""));
        lines.extend(
            FILTER_KEYS
                .iter()
                .map(|hint| Line::from(Span::styled(*hint, self.theme.dim))),
        );
        lines
    }
}
