//! Test fixtures: event builders and a scripted in-memory remote.
//!
//! The remote behaves like a tiny server. Every call passes through a gate;
//! in manual mode the test releases gates one by one (in any order) to force
//! out-of-order completion.

use std::{collections::BTreeMap, time::Duration};

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::{
  dispatch::RecordUpdate,
  event::{Event, EventId, EventPatch, FacetValue, Hour, NewEvent, Position, ResidentId},
  record::DailyRecord,
  remote::CareRemote,
};

// ─── Builders ────────────────────────────────────────────────────────────────

pub fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() }

pub fn event(id: &str, resident: &str, hour: u8, value: FacetValue) -> Event {
  let now = Utc::now();
  Event {
    id: EventId::new(id),
    resident_id: ResidentId::new(resident),
    date: date(),
    hour: Hour::new(hour).unwrap(),
    value,
    created_by: "T".into(),
    created_at: now,
    updated_at: now,
  }
}

pub fn stamp(id: &str, resident: &str, hour: u8, actor: &str) -> Event {
  event(id, resident, hour, FacetValue::Stamp(actor.into()))
}

pub fn position(id: &str, resident: &str, hour: u8, p: Position) -> Event {
  event(id, resident, hour, FacetValue::Position(p))
}

pub fn note(id: &str, resident: &str, hour: u8, text: &str) -> Event {
  event(id, resident, hour, FacetValue::Note(text.into()))
}

pub fn record(id: &str, category: &str, content: &str) -> DailyRecord {
  DailyRecord {
    record_id:   id.into(),
    category:    category.into(),
    resident_id: ResidentId::new("R1"),
    date:        date(),
    recorded_at: Utc::now(),
    author:      "T".into(),
    content:     content.into(),
  }
}

/// Let spawned tasks on the current-thread runtime run to their next
/// suspension point.
pub async fn drain() {
  for _ in 0..32 {
    tokio::task::yield_now().await;
  }
}

// ─── Scripted remote ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FakeError {
  #[error("scripted failure")]
  Scripted,
  #[error("no such entity: {0}")]
  NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  Fetch(NaiveDate),
  Create(NewEvent),
  Update(EventId, EventPatch),
  Delete(EventId),
  FetchRecords(NaiveDate),
  UpdateRecord(RecordUpdate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
  Fetch,
  Create,
  Update,
  Delete,
  FetchRecords,
  UpdateRecord,
}

impl Call {
  pub fn kind(&self) -> CallKind {
    match self {
      Self::Fetch(_) => CallKind::Fetch,
      Self::Create(_) => CallKind::Create,
      Self::Update(..) => CallKind::Update,
      Self::Delete(_) => CallKind::Delete,
      Self::FetchRecords(_) => CallKind::FetchRecords,
      Self::UpdateRecord(_) => CallKind::UpdateRecord,
    }
  }
}

#[derive(Default)]
struct Script {
  manual:   bool,
  failures: Vec<CallKind>,
  calls:    Vec<Call>,
  gates:    Vec<(Call, oneshot::Sender<bool>)>,
  next_id:  u64,
  events:   BTreeMap<EventId, Event>,
  records:  Vec<DailyRecord>,
}

pub struct ScriptedRemote {
  actor:  String,
  script: Mutex<Script>,
}

impl ScriptedRemote {
  /// Every call succeeds immediately unless a failure was queued.
  pub fn auto(actor: &str) -> Self {
    Self { actor: actor.into(), script: Mutex::new(Script::default()) }
  }

  /// Every call waits until the test releases it.
  pub fn manual(actor: &str) -> Self {
    let remote = Self::auto(actor);
    remote.script.lock().manual = true;
    remote
  }

  /// In auto mode, make the next call of `kind` fail.
  pub fn fail_next(&self, kind: CallKind) { self.script.lock().failures.push(kind); }

  pub fn seed_events(&self, events: impl IntoIterator<Item = Event>) {
    let mut s = self.script.lock();
    for e in events {
      s.events.insert(e.id.clone(), e);
    }
  }

  pub fn seed_records(&self, records: impl IntoIterator<Item = DailyRecord>) {
    self.script.lock().records.extend(records);
  }

  pub fn calls(&self) -> Vec<Call> { self.script.lock().calls.clone() }

  pub fn calls_of(&self, kind: CallKind) -> Vec<Call> {
    self.calls().into_iter().filter(|c| c.kind() == kind).collect()
  }

  /// Events the fake server currently holds.
  pub fn server_events(&self) -> Vec<Event> {
    self.script.lock().events.values().cloned().collect()
  }

  pub fn server_records(&self) -> Vec<DailyRecord> { self.script.lock().records.clone() }

  /// Calls waiting on a gate, oldest first.
  pub fn waiting(&self) -> Vec<Call> {
    self.script.lock().gates.iter().map(|(c, _)| c.clone()).collect()
  }

  /// Open the oldest waiting gate of `kind`. Returns `false` if none waits.
  pub fn release(&self, kind: CallKind, ok: bool) -> bool {
    let mut s = self.script.lock();
    let Some(i) = s.gates.iter().position(|(c, _)| c.kind() == kind) else {
      return false;
    };
    let (_, tx) = s.gates.remove(i);
    tx.send(ok).is_ok()
  }

  /// Open the most recent waiting gate of `kind`.
  pub fn release_newest(&self, kind: CallKind, ok: bool) -> bool {
    let mut s = self.script.lock();
    let Some(i) = s.gates.iter().rposition(|(c, _)| c.kind() == kind) else {
      return false;
    };
    let (_, tx) = s.gates.remove(i);
    tx.send(ok).is_ok()
  }

  async fn gate(&self, call: Call) -> Result<(), FakeError> {
    let rx = {
      let mut s = self.script.lock();
      s.calls.push(call.clone());
      if !s.manual {
        if let Some(i) = s.failures.iter().position(|k| *k == call.kind()) {
          s.failures.remove(i);
          return Err(FakeError::Scripted);
        }
        return Ok(());
      }
      let (tx, rx) = oneshot::channel();
      s.gates.push((call, tx));
      rx
    };
    match tokio::time::timeout(Duration::from_secs(5), rx).await {
      Ok(Ok(true)) => Ok(()),
      _ => Err(FakeError::Scripted),
    }
  }
}

impl CareRemote for ScriptedRemote {
  type Error = FakeError;

  async fn fetch_events(&self, date: NaiveDate) -> Result<Vec<Event>, FakeError> {
    self.gate(Call::Fetch(date)).await?;
    let s = self.script.lock();
    Ok(s.events.values().filter(|e| e.date == date).cloned().collect())
  }

  async fn create_event(&self, input: NewEvent) -> Result<Event, FakeError> {
    self.gate(Call::Create(input.clone())).await?;
    let mut s = self.script.lock();
    s.next_id += 1;
    let now = Utc::now();
    let event = Event {
      id:          EventId::new(format!("srv-{}", s.next_id)),
      resident_id: input.resident_id,
      date:        input.date,
      hour:        input.hour,
      value:       input.value,
      created_by:  input.actor,
      created_at:  now,
      updated_at:  now,
    };
    s.events.insert(event.id.clone(), event.clone());
    Ok(event)
  }

  async fn update_event(&self, id: EventId, patch: EventPatch) -> Result<Event, FakeError> {
    self.gate(Call::Update(id.clone(), patch.clone())).await?;
    let mut s = self.script.lock();
    let event = s
      .events
      .get_mut(&id)
      .ok_or_else(|| FakeError::NotFound(id.to_string()))?;
    event.value = FacetValue::Note(patch.note);
    event.updated_at = Utc::now();
    Ok(event.clone())
  }

  async fn delete_event(&self, id: EventId) -> Result<(), FakeError> {
    self.gate(Call::Delete(id.clone())).await?;
    self
      .script
      .lock()
      .events
      .remove(&id)
      .map(|_| ())
      .ok_or_else(|| FakeError::NotFound(id.to_string()))
  }

  async fn fetch_daily_records(&self, date: NaiveDate) -> Result<Vec<DailyRecord>, FakeError> {
    self.gate(Call::FetchRecords(date)).await?;
    let s = self.script.lock();
    Ok(s.records.iter().filter(|r| r.date == date).cloned().collect())
  }

  async fn update_record(&self, update: RecordUpdate) -> Result<(), FakeError> {
    self.gate(Call::UpdateRecord(update.clone())).await?;
    let mut s = self.script.lock();
    let row = s
      .records
      .iter_mut()
      .find(|r| r.record_id == update.record_id)
      .ok_or_else(|| FakeError::NotFound(update.record_id.clone()))?;
    row.content = update.content;
    Ok(())
  }

  fn current_actor(&self) -> String { self.actor.clone() }
}
