//! Data tab: the most recent resampled buckets as a table.
//!
//! Renders a bordered [`ratatui::widgets::Table`] with one row per bucket
//! plus a highlighted totals row covering the whole filtered range.

use ratatui::{
    layout::{Constraint, Rect},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use meter_core::formatting;
use meter_core::models::ResampledTable;
use meter_core::time_utils::format_bucket;

use crate::themes::Theme;

/// Rows shown in the data tab.
pub const DATA_TAIL_ROWS: usize = 100;

const TIMESTAMP_WIDTH: u16 = 17;
const MIN_VALUE_WIDTH: u16 = 12;

/// Render the last [`DATA_TAIL_ROWS`] buckets of `table` into `area`.
pub fn render_data_table(frame: &mut Frame, area: Rect, table: &ResampledTable, theme: &Theme) {
    let tail = table.table.tail(DATA_TAIL_ROWS);

    let header_cells = std::iter::once("Timestamp")
        .chain(tail.columns().iter().map(String::as_str))
        .map(|h| Cell::from(h.to_string()).style(theme.table_header));
    let header = Row::new(header_cells).height(1);

    let data_rows: Vec<Row> = (0..tail.len())
        .map(|row| {
            let style = if row % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            let mut cells = vec![Cell::from(format_bucket(
                tail.index()[row],
                table.granularity,
            ))];
            cells.extend(
                tail.row(row)
                    .into_iter()
                    .map(|v| Cell::from(formatting::format_number(v, 2))),
            );
            Row::new(cells).style(style)
        })
        .collect();

    let mut total_cells = vec![Cell::from("TOTAL")];
    total_cells.extend(
        table
            .table
            .column_totals()
            .into_iter()
            .map(|(_, total)| Cell::from(formatting::format_number(total, 2))),
    );
    let total_row = Row::new(total_cells).style(theme.table_total);

    let mut all_rows = data_rows;
    all_rows.push(total_row);

    let widths: Vec<Constraint> = std::iter::once(Constraint::Length(TIMESTAMP_WIDTH))
        .chain(tail.columns().iter().map(|name| {
            let width = (name.width() as u16).max(MIN_VALUE_WIDTH);
            Constraint::Length(width)
        }))
        .collect();

    let title = format!(
        " Last {} of {} {} buckets (VAh) ",
        tail.len(),
        table.len(),
        table.granularity.label()
    );

    let widget = Table::new(all_rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(theme.text);

    frame.render_widget(widget, area);
}
