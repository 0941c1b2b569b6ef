//! Application state machine and key dispatcher.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use rounds_core::{
  coordinator::{Coordinator, Settlement},
  daily::DailyLog,
  event::{FacetValue, Hour, Position},
  grid::Grid,
  notice::{Notice, Notices},
  record::DailyRecord,
  resident::Resident,
};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::debug;

use crate::client::HttpRemote;

// ─── Screen ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  /// Residents × hours for the selected date.
  Grid,
  /// Every daily record for the selected date.
  Daily,
}

// ─── Editor ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
  Note { resident: usize, hour: Hour },
  Record { record_id: String },
}

/// A one-line text input owned by the screen that opened it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Editor {
  pub target: EditTarget,
  pub buffer: String,
}

// ─── App ──────────────────────────────────────────────────────────────────────

pub struct App {
  pub screen: Screen,

  /// Every resident, in the server's room order.
  pub residents: Vec<Resident>,

  pub filter:        String,
  pub filter_active: bool,

  /// Row within the *filtered* resident list.
  pub row_cursor:    usize,
  pub hour_cursor:   Hour,
  pub record_cursor: usize,

  /// Set while the user is typing a note or record text.
  pub editor: Option<Editor>,

  /// One-line message shown in the status bar.
  pub status_msg: String,

  pub coordinator: Arc<Coordinator<HttpRemote>>,
  pub daily:       Arc<DailyLog<HttpRemote>>,

  client:  Arc<HttpRemote>,
  notices: broadcast::Receiver<Notice>,
}

impl App {
  pub fn new(client: HttpRemote, date: NaiveDate, start_hour: Hour) -> Self {
    let client = Arc::new(client);
    let notices = Notices::new();
    let coordinator = Coordinator::with_notices(Arc::clone(&client), date, notices.clone());
    let daily = DailyLog::with_notices(Arc::clone(&client), date, notices.clone());
    Self {
      screen: Screen::Grid,
      residents: Vec::new(),
      filter: String::new(),
      filter_active: false,
      row_cursor: 0,
      hour_cursor: start_hour,
      record_cursor: 0,
      editor: None,
      status_msg: String::new(),
      coordinator,
      daily,
      client,
      notices: notices.subscribe(),
    }
  }

  pub fn date(&self) -> NaiveDate { self.coordinator.date() }

  pub fn grid(&self) -> Arc<Grid> { self.coordinator.grid() }

  pub fn records(&self) -> Arc<Vec<DailyRecord>> { self.daily.rows() }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Fetch residents, the grid and the daily records for the current date.
  pub async fn load(&mut self) -> anyhow::Result<()> {
    self.status_msg = "Loading…".into();
    self.residents = self.client.list_residents().await?;
    self.row_cursor = 0;
    self.reload().await;
    Ok(())
  }

  async fn reload(&mut self) {
    let date = self.date();
    let grid = self.coordinator.refresh().await;
    let daily = self.daily.load(date).await;
    self.status_msg = match grid.err().or(daily.err()) {
      Some(e) => format!("Error: {e}"),
      None => String::new(),
    };
  }

  async fn shift_date(&mut self, forward: bool) {
    let date = self.date();
    let next = if forward {
      date.checked_add_days(Days::new(1))
    } else {
      date.checked_sub_days(Days::new(1))
    };
    let Some(next) = next else { return };

    self.record_cursor = 0;
    let grid = self.coordinator.select_date(next).await;
    let daily = self.daily.load(next).await;
    self.status_msg = match grid.err().or(daily.err()) {
      Some(e) => format!("Error: {e}"),
      None => String::new(),
    };
  }

  /// Move the latest notice (if any) into the status bar.
  pub fn poll_notices(&mut self) {
    loop {
      match self.notices.try_recv() {
        Ok(notice) => self.status_msg = notice.message(),
        Err(TryRecvError::Lagged(_)) => continue,
        Err(TryRecvError::Empty | TryRecvError::Closed) => break,
      }
    }
  }

  // ── Filtered list ─────────────────────────────────────────────────────────

  pub fn filtered_residents(&self) -> Vec<&Resident> {
    filter_residents(&self.residents, &self.filter)
  }

  pub fn cursor_resident(&self) -> Option<&Resident> {
    self.filtered_residents().get(self.row_cursor).copied()
  }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    if self.editor.is_some() {
      self.handle_editor_key(key);
      return Ok(true);
    }

    if self.filter_active {
      self.handle_filter_key(key);
      return Ok(true);
    }

    match self.screen {
      Screen::Grid => self.handle_grid_key(key).await,
      Screen::Daily => self.handle_daily_key(key).await,
    }
  }

  fn handle_editor_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => self.editor = None,
      KeyCode::Enter => {
        if let Some(editor) = self.editor.take() {
          self.commit(editor);
        }
      }
      KeyCode::Backspace => {
        if let Some(editor) = self.editor.as_mut() {
          editor.buffer.pop();
        }
      }
      KeyCode::Char(c) => {
        if let Some(editor) = self.editor.as_mut() {
          editor.buffer.push(c);
        }
      }
      _ => {}
    }
  }

  fn handle_filter_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.filter_active = false;
        self.filter.clear();
        self.row_cursor = 0;
      }
      KeyCode::Enter => self.filter_active = false,
      KeyCode::Backspace => {
        self.filter.pop();
        self.row_cursor = 0;
      }
      KeyCode::Char(c) => {
        self.filter.push(c);
        self.row_cursor = 0;
      }
      _ => {}
    }
  }

  async fn handle_grid_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') => return Ok(false),
      KeyCode::Tab => self.screen = Screen::Daily,

      // Navigation
      KeyCode::Down | KeyCode::Char('j') => {
        if self.row_cursor + 1 < self.filtered_residents().len() {
          self.row_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.row_cursor = self.row_cursor.saturating_sub(1);
      }
      KeyCode::Right | KeyCode::Char('l') => {
        self.hour_cursor = Hour::new(self.hour_cursor.get() + 1).unwrap_or(self.hour_cursor);
      }
      KeyCode::Left | KeyCode::Char('h') => {
        if let Some(prev) = self.hour_cursor.get().checked_sub(1) {
          self.hour_cursor = Hour::new(prev).unwrap_or(self.hour_cursor);
        }
      }

      // Gestures
      KeyCode::Char('s') => {
        if let Some(resident) = self.cursor_resident() {
          let settle = self.coordinator.toggle_stamp(&resident.resident_id, self.hour_cursor);
          spawn(settle);
        }
      }
      KeyCode::Char(c @ '0'..='3') => {
        let position = match c {
          '1' => Some(Position::Left),
          '2' => Some(Position::Right),
          '3' => Some(Position::Supine),
          _ => None,
        };
        if let Some(resident) = self.cursor_resident() {
          let settle =
            self.coordinator.set_position(&resident.resident_id, self.hour_cursor, position);
          spawn(settle);
        }
      }
      KeyCode::Char('n') => self.open_note_editor(),
      KeyCode::Char('x') => self.delete_note(),

      // Date and data
      KeyCode::Char('[') => self.shift_date(false).await,
      KeyCode::Char(']') => self.shift_date(true).await,
      KeyCode::Char('r') => self.reload().await,

      KeyCode::Char('/') => {
        self.filter_active = true;
        self.filter.clear();
        self.row_cursor = 0;
      }

      _ => {}
    }
    Ok(true)
  }

  async fn handle_daily_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') => return Ok(false),
      KeyCode::Tab | KeyCode::Esc => self.screen = Screen::Grid,

      KeyCode::Down | KeyCode::Char('j') => {
        if self.record_cursor + 1 < self.records().len() {
          self.record_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.record_cursor = self.record_cursor.saturating_sub(1);
      }

      KeyCode::Char('e') | KeyCode::Enter => {
        if let Some(row) = self.records().get(self.record_cursor) {
          self.editor = Some(Editor {
            target: EditTarget::Record { record_id: row.record_id.clone() },
            buffer: row.content.clone(),
          });
        }
      }

      KeyCode::Char('[') => self.shift_date(false).await,
      KeyCode::Char(']') => self.shift_date(true).await,
      KeyCode::Char('r') => self.reload().await,

      _ => {}
    }
    Ok(true)
  }

  // ── Gestures ──────────────────────────────────────────────────────────────

  fn open_note_editor(&mut self) {
    let Some(resident) = self.cursor_resident() else { return };
    let current = self
      .grid()
      .cell(&resident.resident_id, self.hour_cursor)
      .and_then(|cell| cell.note.as_ref())
      .map(|event| match &event.value {
        FacetValue::Note(text) => text.clone(),
        other => other.display().to_owned(),
      })
      .unwrap_or_default();
    self.editor = Some(Editor {
      target: EditTarget::Note { resident: self.row_cursor, hour: self.hour_cursor },
      buffer: current,
    });
  }

  fn delete_note(&mut self) {
    let Some(resident) = self.cursor_resident() else { return };
    let grid = self.grid();
    let note = grid.cell(&resident.resident_id, self.hour_cursor).and_then(|c| c.note.as_ref());
    match note {
      Some(event) => spawn(self.coordinator.delete_event(&event.id)),
      None => self.status_msg = "No note here.".into(),
    }
  }

  fn commit(&mut self, editor: Editor) {
    match editor.target {
      EditTarget::Note { resident, hour } => {
        let Some(resident) = self.filtered_residents().get(resident).copied() else { return };
        let settle = self.coordinator.set_note(&resident.resident_id, hour, &editor.buffer);
        spawn(settle);
      }
      EditTarget::Record { record_id } => {
        spawn(self.daily.edit_content(&record_id, &editor.buffer));
      }
    }
  }
}

/// Run the remote phase of a gesture in the background. Failures reach the
/// user through the notice channel.
fn spawn(settle: Settlement) {
  tokio::spawn(async move {
    if let Err(e) = settle.await {
      debug!(error = %e, "gesture settled with an error");
    }
  });
}

/// Residents whose name or room fuzzy-matches `query`; all of them when the
/// query is empty.
pub fn filter_residents<'a>(residents: &'a [Resident], query: &str) -> Vec<&'a Resident> {
  if query.is_empty() {
    return residents.iter().collect();
  }
  let matcher = SkimMatcherV2::default();
  residents
    .iter()
    .filter(|r| {
      matcher.fuzzy_match(&r.name, query).is_some()
        || r
          .room
          .as_deref()
          .is_some_and(|room| matcher.fuzzy_match(room, query).is_some())
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use rounds_core::event::ResidentId;

  use super::*;
  use crate::client::ApiConfig;

  fn resident(id: &str, name: &str, room: Option<&str>) -> Resident {
    Resident {
      resident_id: ResidentId::new(id),
      name:        name.into(),
      room:        room.map(Into::into),
      created_at:  Utc::now(),
    }
  }

  fn app() -> App {
    let client = HttpRemote::new(ApiConfig {
      base_url: "http://127.0.0.1:9".into(),
      username: String::new(),
      password: String::new(),
      actor:    "T".into(),
    })
    .unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    let mut app = App::new(client, date, Hour::new(9).unwrap());
    app.residents = vec![
      resident("R1", "Sato Hanako", Some("101")),
      resident("R2", "Ito Jiro", Some("102")),
      resident("R3", "Kato Yumi", None),
    ];
    app
  }

  fn key(code: KeyCode) -> KeyEvent { KeyEvent::new(code, KeyModifiers::NONE) }

  #[test]
  fn empty_filter_keeps_everyone() {
    let residents = [resident("R1", "Sato", None), resident("R2", "Ito", None)];
    assert_eq!(filter_residents(&residents, "").len(), 2);
  }

  #[test]
  fn filter_matches_name_or_room() {
    let residents = [
      resident("R1", "Sato Hanako", Some("101")),
      resident("R2", "Ito Jiro", Some("205")),
    ];
    let by_name: Vec<_> = filter_residents(&residents, "hnk").iter().map(|r| &r.name).collect();
    assert_eq!(by_name, ["Sato Hanako"]);
    let by_room: Vec<_> = filter_residents(&residents, "205").iter().map(|r| &r.name).collect();
    assert_eq!(by_room, ["Ito Jiro"]);
  }

  #[tokio::test]
  async fn cursor_stays_inside_the_grid() {
    let mut app = app();
    for _ in 0..5 {
      app.handle_key(key(KeyCode::Down)).await.unwrap();
    }
    assert_eq!(app.row_cursor, 2);

    for _ in 0..30 {
      app.handle_key(key(KeyCode::Char('l'))).await.unwrap();
    }
    assert_eq!(app.hour_cursor.get(), 23);
    for _ in 0..30 {
      app.handle_key(key(KeyCode::Char('h'))).await.unwrap();
    }
    assert_eq!(app.hour_cursor.get(), 0);
  }

  #[tokio::test]
  async fn typing_a_filter_narrows_the_rows() {
    let mut app = app();
    app.handle_key(key(KeyCode::Char('/'))).await.unwrap();
    for c in "kato".chars() {
      app.handle_key(key(KeyCode::Char(c))).await.unwrap();
    }
    assert!(app.filter_active);
    assert_eq!(app.filtered_residents().len(), 1);

    app.handle_key(key(KeyCode::Esc)).await.unwrap();
    assert!(!app.filter_active);
    assert_eq!(app.filtered_residents().len(), 3);
  }

  #[tokio::test]
  async fn note_editor_opens_empty_and_cancels() {
    let mut app = app();
    app.handle_key(key(KeyCode::Char('n'))).await.unwrap();
    let editor = app.editor.clone().unwrap();
    assert_eq!(editor.buffer, "");
    assert_eq!(editor.target, EditTarget::Note { resident: 0, hour: Hour::new(9).unwrap() });

    app.handle_key(key(KeyCode::Char('q'))).await.unwrap();
    assert_eq!(app.editor.as_ref().unwrap().buffer, "q");

    app.handle_key(key(KeyCode::Esc)).await.unwrap();
    assert!(app.editor.is_none());
  }

  #[tokio::test]
  async fn tab_switches_screens_and_q_quits() {
    let mut app = app();
    app.handle_key(key(KeyCode::Tab)).await.unwrap();
    assert_eq!(app.screen, Screen::Daily);
    app.handle_key(key(KeyCode::Tab)).await.unwrap();
    assert_eq!(app.screen, Screen::Grid);
    assert!(!app.handle_key(key(KeyCode::Char('q'))).await.unwrap());
  }
}
