//! TUI rendering: header, the active screen, status bar.

pub mod daily_records;
pub mod round_grid;

use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Paragraph},
};

use crate::app::{App, EditTarget, Screen};

// ─── Root draw ────────────────────────────────────────────────────────────────

pub fn draw(f: &mut Frame, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(f.area());

  draw_header(f, rows[0], app);
  match app.screen {
    Screen::Grid => round_grid::draw(f, rows[1], app),
    Screen::Daily => daily_records::draw(f, rows[1], app),
  }
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let left = Span::styled(
    " rounds  [Tab] grid/records  [ ] date  [q] quit",
    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
  );

  let pending = app.coordinator.pending();
  let right_text = if pending > 0 {
    format!("{} · {pending} saving ", app.date())
  } else {
    format!("{} ", app.date())
  };
  let right = Span::styled(right_text, Style::default().fg(Color::Gray));

  let pad = area
    .width
    .saturating_sub(left.content.chars().count() as u16)
    .saturating_sub(right.content.chars().count() as u16);
  let line = Line::from(vec![left, Span::raw(" ".repeat(pad as usize)), right]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, text) = if let Some(editor) = &app.editor {
    let label = match &editor.target {
      EditTarget::Note { hour, .. } => format!("NOTE {hour}"),
      EditTarget::Record { .. } => "RECORD".to_owned(),
    };
    (label, format!("{}_  (Enter save, Esc cancel)", editor.buffer))
  } else {
    let (mode, hints) = match app.screen {
      Screen::Grid if app.filter_active => ("SEARCH", "Type to filter  Esc cancel  Enter keep"),
      Screen::Grid => (
        "GRID",
        "hjkl move  s stamp  1/2/3 左右仰  0 clear  n note  x del note  / search",
      ),
      Screen::Daily => ("RECORDS", "jk move  e edit  Tab grid  r reload"),
    };
    let text = if app.status_msg.is_empty() {
      hints.to_owned()
    } else {
      app.status_msg.clone()
    };
    (mode.to_owned(), text)
  };

  let mode_span = Span::styled(
    format!(" {mode_label} "),
    Style::default()
      .fg(Color::Black)
      .bg(Color::Cyan)
      .add_modifier(Modifier::BOLD),
  );
  let text_style = if app.editor.is_some() {
    Style::default().fg(Color::White)
  } else {
    Style::default().fg(Color::DarkGray)
  };
  let line = Line::from(vec![mode_span, Span::styled(format!("  {text}"), text_style)]);
  f.render_widget(Paragraph::new(line).style(Style::default().bg(Color::Black)), area);
}
