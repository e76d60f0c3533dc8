//! Application state and TUI event loop for the energy dashboard.
//!
//! [`App`] owns the [`DashboardSession`], the filter request being edited
//! and the last successful result. Every edit re-runs the filter; a rejected
//! request is reported in the footer while the previous result stays on
//! screen. The loop is synchronous: it redraws, waits briefly for a key and
//! reacts to it.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Tabs},
    Frame, Terminal,
};

use meter_core::models::FilterSpec;
use meter_data::analysis::FilterOutcome;
use meter_runtime::session::DashboardSession;

use crate::components::filter_panel::FilterPanel;
use crate::dashboard_view::{self, DashboardViewData};
use crate::report;
use crate::table_view;
use crate::themes::Theme;

const FILTER_PANEL_WIDTH: u16 = 30;

// ── Tab ───────────────────────────────────────────────────────────────────────

/// Which tab the TUI is currently rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Dashboard,
    Data,
}

impl Tab {
    pub const TITLES: [&'static str; 2] = ["Dashboard", "Data"];

    pub fn index(self) -> usize {
        match self {
            Tab::Dashboard => 0,
            Tab::Data => 1,
        }
    }

    pub fn next(self) -> Self {
        match self {
            Tab::Dashboard => Tab::Data,
            Tab::Data => Tab::Dashboard,
        }
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the dashboard TUI.
pub struct App {
    pub theme: Theme,
    pub tab: Tab,
    session: DashboardSession,
    /// The request being edited. May be invalid; `view` then still shows the
    /// last request that succeeded.
    pub spec: FilterSpec,
    /// Loaded columns, in table order.
    pub columns: Vec<String>,
    /// Highlighted row of the appliance checklist.
    pub cursor: usize,
    /// Last successful filter result.
    pub view: Option<DashboardViewData>,
    /// Where `r` writes the report.
    pub report_path: PathBuf,
    /// One-line message shown in the footer.
    pub status: Option<String>,
    pub should_quit: bool,
}

impl App {
    /// Build the app and answer `spec` once.
    ///
    /// A rejected initial request leaves `view` empty and the error in
    /// `status`; the user can correct the filter from the TUI.
    pub fn new(
        theme_name: &str,
        session: DashboardSession,
        spec: FilterSpec,
        report_path: PathBuf,
    ) -> Self {
        let mut app = Self {
            theme: Theme::from_name(theme_name),
            tab: Tab::Dashboard,
            session,
            spec,
            columns: Vec::new(),
            cursor: 0,
            view: None,
            report_path,
            status: None,
            should_quit: false,
        };
        app.refilter();
        app
    }

    pub fn session(&self) -> &DashboardSession {
        &self.session
    }

    /// The result currently on screen.
    pub fn outcome(&self) -> Option<&FilterOutcome> {
        self.view.as_ref().map(|v| &v.outcome)
    }

    /// Run the interactive dashboard until the user quits.
    pub fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab => self.tab = self.tab.next(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.write_report(),
            KeyCode::Char('[') => self.edit(|spec| spec.start = shift(spec.start, -1)),
            KeyCode::Char(']') => self.edit(|spec| spec.start = shift(spec.start, 1)),
            KeyCode::Char('{') => self.edit(|spec| spec.end = shift(spec.end, -1)),
            KeyCode::Char('}') => self.edit(|spec| spec.end = shift(spec.end, 1)),
            KeyCode::Up => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down => {
                if self.cursor + 1 < self.columns.len() {
                    self.cursor += 1;
                }
            }
            KeyCode::Char(' ') => self.toggle_appliance(),
            KeyCode::Char('a') | KeyCode::Char('A') => self.toggle_all(),
            KeyCode::F(5) => self.reload(),
            _ => {}
        }
    }

    fn edit(&mut self, change: impl FnOnce(&mut FilterSpec)) {
        change(&mut self.spec);
        self.refilter();
    }

    /// Flip the appliance under the cursor, keeping table order.
    fn toggle_appliance(&mut self) {
        let Some(name) = self.columns.get(self.cursor).cloned() else {
            return;
        };
        let was_selected = self.spec.appliances.contains(&name);
        let appliances: Vec<String> = self
            .columns
            .iter()
            .filter(|c| {
                if **c == name {
                    !was_selected
                } else {
                    self.spec.appliances.contains(c)
                }
            })
            .cloned()
            .collect();
        self.edit(|spec| spec.appliances = appliances);
    }

    /// Select every appliance, or go back to the aggregate alone when
    /// everything is already selected.
    fn toggle_all(&mut self) {
        let all_selected = !self.columns.is_empty()
            && self.columns.iter().all(|c| self.spec.appliances.contains(c));
        let appliances: Vec<String> = if all_selected {
            let aggregate = self.session.aggregate();
            match self.columns.iter().find(|c| *c == aggregate) {
                Some(c) => vec![c.clone()],
                None => self.columns.iter().take(1).cloned().collect(),
            }
        } else {
            self.columns.clone()
        };
        self.edit(|spec| spec.appliances = appliances);
    }

    fn reload(&mut self) {
        match self.session.reload() {
            Ok(_) => self.refilter(),
            Err(e) => {
                tracing::warn!("reload failed: {}", e);
                self.status = Some(format!("Reload failed: {}", e));
            }
        }
    }

    /// Answer the current request. On failure the previous view is kept.
    fn refilter(&mut self) {
        match self.session.apply_filter(self.spec.clone()) {
            Ok(outcome) => {
                self.view = self.session.data().map(|data| DashboardViewData {
                    data_dir: self.session.data_dir().display().to_string(),
                    available: data.table.date_range(),
                    outcome,
                    threshold: self.session.threshold(),
                    warnings: data.warnings.iter().map(ToString::to_string).collect(),
                });
                self.status = None;
            }
            Err(e) if e.is_filter_error() => {
                self.status = Some(format!("Filter rejected: {}", e));
            }
            Err(e) => {
                self.status = Some(format!("Load failed: {}", e));
            }
        }

        self.columns = self
            .session
            .data()
            .map(|data| data.table.columns().to_vec())
            .unwrap_or_default();
        self.cursor = self.cursor.min(self.columns.len().saturating_sub(1));
    }

    fn write_report(&mut self) {
        let Some(view) = &self.view else {
            self.status = Some("Nothing to report".to_string());
            return;
        };
        let selection = view.outcome.resampled.columns().to_vec();
        self.status = Some(
            match report::write_report(&self.report_path, &view.outcome, &selection) {
                Ok(path) => format!("Report written to {}", path.display()),
                Err(e) => {
                    tracing::error!("report failed: {}", e);
                    format!("Report failed: {}", e)
                }
            },
        );
    }

    /// Draw the current state into `frame`.
    pub fn render(&self, frame: &mut Frame) {
        let [tabs_area, body, footer] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let tabs = Tabs::new(Tab::TITLES)
            .select(self.tab.index())
            .style(self.theme.tab_inactive)
            .highlight_style(self.theme.tab_active)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Energy Dashboard "),
            );
        frame.render_widget(tabs, tabs_area);

        let [filter_area, main_area] =
            Layout::horizontal([Constraint::Length(FILTER_PANEL_WIDTH), Constraint::Min(0)])
                .areas(body);

        let panel = FilterPanel::new(&self.spec, &self.columns, self.cursor, &self.theme);
        frame.render_widget(
            Paragraph::new(Text::from(panel.to_lines()))
                .block(Block::default().borders(Borders::ALL).title(" Filter ")),
            filter_area,
        );

        match (&self.view, self.tab) {
            (None, _) => dashboard_view::render_no_data(
                frame,
                main_area,
                self.status.as_deref().unwrap_or("No filter result yet"),
                &self.theme,
            ),
            (Some(view), Tab::Dashboard) => {
                dashboard_view::render_dashboard(frame, main_area, view, &self.theme)
            }
            (Some(view), Tab::Data) => {
                table_view::render_data_table(frame, main_area, &view.outcome.resampled, &self.theme)
            }
        }

        let footer_line = match &self.status {
            Some(status) => Line::from(Span::styled(status.clone(), self.theme.warning)),
            None => Line::from(Span::styled(
                "Tab: switch view | r: write report | F5: reload | q: quit",
                self.theme.dim,
            )),
        };
        frame.render_widget(Paragraph::new(footer_line), footer);
    }
}

fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(chrono::Duration::days(days))
        .unwrap_or(date)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
