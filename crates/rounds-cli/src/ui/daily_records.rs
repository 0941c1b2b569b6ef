//! Daily records screen: every record for the date, one row each.

use chrono::Local;
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, List, ListItem, ListState},
};
use rounds_core::dispatch::RecordCategory;

use crate::app::App;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let rows = app.records();
  let block = Block::default()
    .title(format!(" Daily records {} ({}) ", app.date(), rows.len()))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  let items: Vec<ListItem> = rows
    .iter()
    .map(|row| {
      let resident = app
        .residents
        .iter()
        .find(|r| r.resident_id == row.resident_id)
        .map(|r| r.name.as_str())
        .unwrap_or(row.resident_id.as_str());

      // Rows in a category with no resource can be read but not edited.
      let category_style = if RecordCategory::from_label(&row.category).is_ok() {
        Style::default().fg(Color::Cyan)
      } else {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
      };

      ListItem::new(Line::from(vec![
        Span::styled(
          row.recorded_at.with_timezone(&Local).format("%H:%M ").to_string(),
          Style::default().fg(Color::DarkGray),
        ),
        Span::raw(format!("{resident:<14} ")),
        Span::styled(format!("{:<12}", row.category), category_style),
        Span::raw(row.content.clone()),
        Span::styled(format!("  {}", row.author), Style::default().fg(Color::DarkGray)),
      ]))
    })
    .collect();

  let mut state = ListState::default();
  state.select((!rows.is_empty()).then_some(app.record_cursor));

  f.render_stateful_widget(
    List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::Blue)
          .fg(Color::White)
          .add_modifier(Modifier::BOLD),
      ),
    area,
    &mut state,
  );
}
