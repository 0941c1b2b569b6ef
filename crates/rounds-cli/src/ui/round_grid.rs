//! Residents × hours grid.

use std::ops::Range;

use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};
use rounds_core::{
  event::{FacetValue, Hour},
  grid::Cell,
};

use crate::app::App;

const NAME_WIDTH: u16 = 18;
const CELL_WIDTH: u16 = 5;

pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let residents = app.filtered_residents();
  let title = if app.filter_active || !app.filter.is_empty() {
    format!(" Rounds {} ({}/{}) ", app.date(), residents.len(), app.residents.len())
  } else {
    format!(" Rounds {} ({}) ", app.date(), residents.len())
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  let mut inner = block.inner(area);
  f.render_widget(block, area);

  if app.filter_active || !app.filter.is_empty() && inner.height > 2 {
    let filter_area = Rect { y: inner.y + inner.height.saturating_sub(1), height: 1, ..inner };
    inner.height = inner.height.saturating_sub(1);
    let text = if app.filter_active {
      format!("/{}_", app.filter)
    } else {
      format!("/{}", app.filter)
    };
    f.render_widget(Paragraph::new(text).style(Style::default().fg(Color::Yellow)), filter_area);
  }

  let visible = (inner.width.saturating_sub(NAME_WIDTH) / CELL_WIDTH).min(u16::from(Hour::COUNT));
  let hours = hour_window(app.hour_cursor.get(), visible as u8);

  let mut lines = Vec::with_capacity(residents.len() + 1);
  lines.push(header_line(hours.clone(), app.hour_cursor));

  // Keep the cursor row on screen.
  let body_rows = usize::from(inner.height.saturating_sub(1));
  let skip = (app.row_cursor + 1).saturating_sub(body_rows);

  let grid = app.grid();
  for (i, resident) in residents.iter().enumerate().skip(skip).take(body_rows) {
    let on_row = i == app.row_cursor;
    let label = match &resident.room {
      Some(room) => format!("{room} {}", resident.name),
      None => resident.name.clone(),
    };
    let name_style = if on_row {
      Style::default().add_modifier(Modifier::BOLD)
    } else {
      Style::default()
    };
    let mut spans = vec![Span::styled(fit(&label, NAME_WIDTH as usize), name_style)];

    for h in hours.clone() {
      let Ok(hour) = Hour::new(h) else { continue };
      let cell = grid.cell(&resident.resident_id, hour);
      let mut style = if cell.is_some_and(has_placeholder) {
        Style::default().fg(Color::Yellow)
      } else {
        Style::default()
      };
      if on_row && hour == app.hour_cursor {
        style = style.bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD);
      }
      spans.push(Span::styled(cell_text(cell), style));
    }
    lines.push(Line::from(spans));
  }

  if residents.is_empty() {
    lines.push(Line::from(Span::styled(
      "No residents.",
      Style::default().fg(Color::DarkGray),
    )));
  }

  f.render_widget(Paragraph::new(lines), inner);
}

fn header_line(hours: Range<u8>, cursor: Hour) -> Line<'static> {
  let mut spans = vec![Span::raw(" ".repeat(NAME_WIDTH as usize))];
  for h in hours {
    let style = if h == cursor.get() {
      Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
      Style::default().fg(Color::DarkGray)
    };
    spans.push(Span::styled(format!("{h:02}   "), style));
  }
  Line::from(spans)
}

/// Stamp initial, position glyph, note marker: `T左* `.
pub fn cell_text(cell: Option<&Cell>) -> String {
  let Some(cell) = cell else { return "·    ".to_owned() };

  let stamp = match cell.stamp.as_ref().map(|e| &e.value) {
    Some(FacetValue::Stamp(s)) => s.chars().next().unwrap_or('✓'),
    _ => '·',
  };
  let position = match cell.position.as_ref().map(|e| &e.value) {
    Some(FacetValue::Position(p)) => p.glyph(),
    _ => "  ",
  };
  let note = if cell.note.is_some() { '*' } else { ' ' };
  format!("{stamp}{position}{note} ")
}

fn has_placeholder(cell: &Cell) -> bool {
  [&cell.stamp, &cell.position, &cell.note]
    .into_iter()
    .flatten()
    .any(|e| e.id.is_placeholder())
}

/// The run of `visible` hours that contains `cursor`, kept roughly centred.
pub fn hour_window(cursor: u8, visible: u8) -> Range<u8> {
  let visible = visible.clamp(1, Hour::COUNT);
  let start = cursor.saturating_sub(visible / 2).min(Hour::COUNT - visible);
  start..start + visible
}

fn fit(s: &str, width: usize) -> String {
  let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
  while out.chars().count() < width {
    out.push(' ');
  }
  out
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};
  use rounds_core::event::{Event, EventId, Position, ResidentId};

  use super::*;

  fn event(id: &str, value: FacetValue) -> Event {
    Event {
      id: EventId::new(id),
      resident_id: ResidentId::new("R1"),
      date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
      hour: Hour::new(9).unwrap(),
      value,
      created_by: "T".into(),
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  #[test]
  fn empty_cell_is_a_dot() {
    assert_eq!(cell_text(None), "·    ");
    assert_eq!(cell_text(Some(&Cell::default())), "·    ");
  }

  #[test]
  fn full_cell_shows_every_facet() {
    let cell = Cell {
      stamp:    Some(event("a", FacetValue::Stamp("Tanaka".into()))),
      position: Some(event("b", FacetValue::Position(Position::Left))),
      note:     Some(event("c", FacetValue::Note("restless".into()))),
    };
    assert_eq!(cell_text(Some(&cell)), "T左* ");
  }

  #[test]
  fn placeholder_cells_are_flagged() {
    let cell = Cell {
      stamp: Some(event("temp-1", FacetValue::Stamp("T".into()))),
      ..Cell::default()
    };
    assert!(has_placeholder(&cell));
    assert!(!has_placeholder(&Cell::default()));
  }

  #[test]
  fn window_follows_the_cursor() {
    assert_eq!(hour_window(9, 24), 0..24);
    assert_eq!(hour_window(9, 40), 0..24);
    assert_eq!(hour_window(0, 6), 0..6);
    assert_eq!(hour_window(12, 6), 9..15);
    assert_eq!(hour_window(23, 6), 18..24);
  }
}
