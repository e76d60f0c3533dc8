use ratatui::style::{Color, Modifier, Style};

/// Whether the terminal draws on a dark or a light background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundType {
    Dark,
    Light,
}

/// Read the background from `COLORFGBG` (`"fg;bg"`).
///
/// Background values 0–6 are dark, 7–15 light. Anything else is treated as
/// dark.
pub fn detect_background() -> BackgroundType {
    std::env::var("COLORFGBG")
        .ok()
        .and_then(|val| parse_colorfgbg(&val))
        .unwrap_or(BackgroundType::Dark)
}

fn parse_colorfgbg(val: &str) -> Option<BackgroundType> {
    let bg: u8 = val.split(';').next_back()?.parse().ok()?;
    Some(if bg <= 6 {
        BackgroundType::Dark
    } else {
        BackgroundType::Light
    })
}

/// The handful of colours a theme is derived from.
#[derive(Debug, Clone, Copy)]
struct Palette {
    foreground: Color,
    muted: Color,
    faint: Color,
    accent: Color,
    highlight: Color,
    good: Color,
    caution: Color,
    alert: Color,
    series: &'static [Color],
}

const DARK: Palette = Palette {
    foreground: Color::White,
    muted: Color::Gray,
    faint: Color::DarkGray,
    accent: Color::Cyan,
    highlight: Color::Yellow,
    good: Color::Green,
    caution: Color::Yellow,
    alert: Color::Red,
    series: &[
        Color::Cyan,
        Color::Yellow,
        Color::Green,
        Color::Magenta,
        Color::LightBlue,
        Color::LightRed,
        Color::White,
        Color::LightGreen,
    ],
};

const LIGHT: Palette = Palette {
    foreground: Color::Black,
    muted: Color::DarkGray,
    faint: Color::Gray,
    accent: Color::Blue,
    highlight: Color::Magenta,
    good: Color::Green,
    caution: Color::Yellow,
    alert: Color::Red,
    series: &[
        Color::Blue,
        Color::Magenta,
        Color::Green,
        Color::Red,
        Color::Cyan,
        Color::Yellow,
        Color::Black,
        Color::DarkGray,
    ],
};

/// Styles used by the dashboard widgets.
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub separator: Style,

    pub text: Style,
    pub dim: Style,
    pub label: Style,
    pub value: Style,

    pub info: Style,
    pub success: Style,
    pub warning: Style,

    pub tab_active: Style,
    pub tab_inactive: Style,

    pub table_header: Style,
    pub table_row: Style,
    pub table_row_alt: Style,
    pub table_total: Style,

    pub axis: Style,
    /// Line colours, cycled per appliance.
    pub series: Vec<Color>,
    pub anomaly: Style,
}

impl Theme {
    fn from_palette(p: &Palette) -> Self {
        let plain = |c: Color| Style::default().fg(c);
        let bold = |c: Color| Style::default().fg(c).add_modifier(Modifier::BOLD);

        Self {
            header: bold(p.accent),
            separator: plain(p.faint),

            text: plain(p.foreground),
            dim: plain(p.faint),
            label: plain(p.muted),
            value: bold(p.foreground),

            info: plain(p.accent),
            success: plain(p.good),
            warning: plain(p.caution),

            tab_active: bold(p.highlight).add_modifier(Modifier::UNDERLINED),
            tab_inactive: plain(p.muted),

            table_header: bold(p.accent),
            table_row: plain(p.foreground),
            table_row_alt: plain(p.muted),
            table_total: bold(p.highlight),

            axis: plain(p.muted),
            series: p.series.to_vec(),
            anomaly: bold(p.alert),
        }
    }

    /// Theme for dark terminals; the fallback when detection fails.
    pub fn dark() -> Self {
        Self::from_palette(&DARK)
    }

    pub fn light() -> Self {
        Self::from_palette(&LIGHT)
    }

    pub fn auto_detect() -> Self {
        match detect_background() {
            BackgroundType::Light => Self::light(),
            BackgroundType::Dark => Self::dark(),
        }
    }

    /// Theme by name: `"light"`, `"dark"`, anything else auto-detects.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            _ => Self::auto_detect(),
        }
    }

    /// Line style of the `index`-th plotted appliance.
    pub fn series_style(&self, index: usize) -> Style {
        match self.series.len() {
            0 => self.text,
            n => Style::default().fg(self.series[index % n]),
        }
    }
}
