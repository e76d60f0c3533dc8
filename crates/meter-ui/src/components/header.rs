use chrono::NaiveDate;
use ratatui::text::{Line, Span};

use crate::themes::Theme;

/// Title shown at the top of the dashboard.
pub const TITLE: &str = "HOUSEHOLD ENERGY DASHBOARD";

/// Width of the `=` rule under the title.
pub const SEPARATOR_WIDTH: usize = 60;

/// Dashboard header rendering three lines:
///
/// 1. The title.
/// 2. A `=` separator.
/// 3. `[ data dir | available range | bucket width ]`.
pub struct Header<'a> {
    pub data_dir: &'a str,
    /// First and last date with readings.
    pub available: Option<(NaiveDate, NaiveDate)>,
    /// `"hourly"` or `"daily"`.
    pub granularity: &'a str,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(
        data_dir: &'a str,
        available: Option<(NaiveDate, NaiveDate)>,
        granularity: &'a str,
        theme: &'a Theme,
    ) -> Self {
        Self {
            data_dir,
            available,
            granularity,
            theme,
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let range = match self.available {
            Some((first, last)) => format!("data {} to {}", first, last),
            None => "no data".to_string(),
        };

        vec![
            Line::from(Span::styled(TITLE, self.theme.header)),
            Line::from(Span::styled(
                "=".repeat(SEPARATOR_WIDTH),
                self.theme.separator,
            )),
            Line::from(vec![
                Span::styled("[ ", self.theme.label),
                Span::styled(self.data_dir, self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(range, self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(self.granularity, self.theme.value),
                Span::styled(" ]", self.theme.label),
            ]),
        ]
    }
}
