//! [`SqliteStore`]: the SQLite implementation of [`CareRepository`].

use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use rounds_core::{
  dispatch::{RecordCategory, RecordUpdate},
  event::{Event, EventId, EventPatch, FacetKind, FacetValue, NewEvent, ResidentId},
  record::{DailyRecord, NewRecord},
  repository::CareRepository,
  resident::{NewResident, Resident},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    EVENT_COLUMNS, RECORD_COLUMNS, RawEvent, RawRecord, RawResident, encode_date, encode_dt,
    encode_value,
  },
  schema::SCHEMA,
};

fn new_id() -> String { Uuid::new_v4().hyphenated().to_string() }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A care-record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    debug!(path = %path.display(), "opening sqlite store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn insert_event(&self, event: &Event) -> Result<()> {
    let id          = event.id.as_str().to_owned();
    let resident_id = event.resident_id.as_str().to_owned();
    let date        = encode_date(event.date);
    let hour        = event.hour.get();
    let facet       = event.facet().as_str();
    let value_json  = encode_value(&event.value)?;
    let created_by  = event.created_by.clone();
    let created_at  = encode_dt(event.created_at);
    let updated_at  = encode_dt(event.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO events (
             event_id, resident_id, date, hour, facet, value_json,
             created_by, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id,
            resident_id,
            date,
            hour,
            facet,
            value_json,
            created_by,
            created_at,
            updated_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_record(&self, category: RecordCategory, id: String) -> Result<Option<DailyRecord>> {
    let label = category.label();
    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM records WHERE record_id = ?1 AND category = ?2"),
            rusqlite::params![id, label],
            RawRecord::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }
}

// ─── CareRepository impl ─────────────────────────────────────────────────────

impl CareRepository for SqliteStore {
  type Error = Error;

  // ── Residents ─────────────────────────────────────────────────────────────

  async fn add_resident(&self, input: NewResident) -> Result<Resident> {
    let resident = Resident {
      resident_id: ResidentId::new(new_id()),
      name:        input.name,
      room:        input.room,
      created_at:  Utc::now(),
    };

    let id   = resident.resident_id.as_str().to_owned();
    let name = resident.name.clone();
    let room = resident.room.clone();
    let at   = encode_dt(resident.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO residents (resident_id, name, room, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id, name, room, at],
        )?;
        Ok(())
      })
      .await?;

    Ok(resident)
  }

  async fn list_residents(&self) -> Result<Vec<Resident>> {
    let raws: Vec<RawResident> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT resident_id, name, room, created_at FROM residents
           ORDER BY room IS NULL, room, name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawResident {
              resident_id: row.get(0)?,
              name:        row.get(1)?,
              room:        row.get(2)?,
              created_at:  row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResident::into_resident).collect()
  }

  // ── Events ────────────────────────────────────────────────────────────────

  async fn list_events(&self, date: NaiveDate) -> Result<Vec<Event>> {
    let date = encode_date(date);
    let raws: Vec<RawEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {EVENT_COLUMNS} FROM events WHERE date = ?1 ORDER BY updated_at"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![date], RawEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  async fn get_event(&self, id: EventId) -> Result<Option<Event>> {
    let id = id.as_str().to_owned();
    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ?1"),
            rusqlite::params![id],
            RawEvent::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn create_event(&self, input: NewEvent) -> Result<Event> {
    let now = Utc::now();
    let event = Event {
      id:          EventId::new(new_id()),
      resident_id: input.resident_id,
      date:        input.date,
      hour:        input.hour,
      value:       input.value,
      created_by:  input.actor,
      created_at:  now,
      updated_at:  now,
    };
    self.insert_event(&event).await?;
    Ok(event)
  }

  async fn update_event(&self, id: EventId, patch: EventPatch) -> Result<Option<Event>> {
    let Some(mut event) = self.get_event(id.clone()).await? else {
      return Ok(None);
    };
    if event.facet() != FacetKind::FreeTextNote {
      return Err(Error::NotANote(id));
    }

    event.value = FacetValue::Note(patch.note);
    event.updated_at = Utc::now();

    let id_str     = id.as_str().to_owned();
    let value_json = encode_value(&event.value)?;
    let updated_at = encode_dt(event.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE events SET value_json = ?1, updated_at = ?2 WHERE event_id = ?3",
          rusqlite::params![value_json, updated_at, id_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(Some(event))
  }

  async fn delete_event(&self, id: EventId) -> Result<bool> {
    let id = id.as_str().to_owned();
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM events WHERE event_id = ?1", rusqlite::params![id])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Daily records ─────────────────────────────────────────────────────────

  async fn add_record(&self, category: RecordCategory, input: NewRecord) -> Result<DailyRecord> {
    let record = DailyRecord {
      record_id:   new_id(),
      category:    category.label().to_owned(),
      resident_id: input.resident_id,
      date:        input.date,
      recorded_at: Utc::now(),
      author:      input.author,
      content:     input.content,
    };

    let id          = record.record_id.clone();
    let label       = category.label();
    let resident_id = record.resident_id.as_str().to_owned();
    let date        = encode_date(record.date);
    let recorded_at = encode_dt(record.recorded_at);
    let author      = record.author.clone();
    let content     = record.content.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO records ({RECORD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
          rusqlite::params![id, label, resident_id, date, recorded_at, author, content],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn update_record(&self, update: RecordUpdate) -> Result<Option<DailyRecord>> {
    let route = update.category.route();
    if update.field != route.field {
      return Err(Error::FieldMismatch { resource: route.resource, field: update.field });
    }

    let id      = update.record_id.clone();
    let label   = update.category.label();
    let content = update.content;

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE records SET content = ?1 WHERE record_id = ?2 AND category = ?3",
          rusqlite::params![content, id, label],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_record(update.category, update.record_id).await
  }

  async fn daily_records(&self, date: NaiveDate) -> Result<Vec<DailyRecord>> {
    let date = encode_date(date);
    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM records WHERE date = ?1 ORDER BY recorded_at, record_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![date], RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}
