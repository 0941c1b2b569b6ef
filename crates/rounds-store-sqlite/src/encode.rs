//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings in UTC, dates are `YYYY-MM-DD`, and facet values
//! are stored as their tagged JSON form.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rounds_core::{
  event::{Event, EventId, FacetValue, Hour, ResidentId},
  record::DailyRecord,
  resident::Resident,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width so that `ORDER BY` on the text column is chronological.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(date: NaiveDate) -> String { date.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── FacetValue ──────────────────────────────────────────────────────────────

pub fn encode_value(value: &FacetValue) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_value(s: &str) -> Result<FacetValue> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const EVENT_COLUMNS: &str =
  "event_id, resident_id, date, hour, value_json, created_by, created_at, updated_at";

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:    String,
  pub resident_id: String,
  pub date:        String,
  pub hour:        u8,
  pub value_json:  String,
  pub created_by:  String,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:    row.get(0)?,
      resident_id: row.get(1)?,
      date:        row.get(2)?,
      hour:        row.get(3)?,
      value_json:  row.get(4)?,
      created_by:  row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      id:          EventId::new(self.event_id),
      resident_id: ResidentId::new(self.resident_id),
      date:        decode_date(&self.date)?,
      hour:        Hour::new(self.hour)?,
      value:       decode_value(&self.value_json)?,
      created_by:  self.created_by,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `residents` row.
pub struct RawResident {
  pub resident_id: String,
  pub name:        String,
  pub room:        Option<String>,
  pub created_at:  String,
}

impl RawResident {
  pub fn into_resident(self) -> Result<Resident> {
    Ok(Resident {
      resident_id: ResidentId::new(self.resident_id),
      name:        self.name,
      room:        self.room,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub const RECORD_COLUMNS: &str =
  "record_id, category, resident_id, date, recorded_at, author, content";

/// Raw strings read directly from a `records` row.
pub struct RawRecord {
  pub record_id:   String,
  pub category:    String,
  pub resident_id: String,
  pub date:        String,
  pub recorded_at: String,
  pub author:      String,
  pub content:     String,
}

impl RawRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:   row.get(0)?,
      category:    row.get(1)?,
      resident_id: row.get(2)?,
      date:        row.get(3)?,
      recorded_at: row.get(4)?,
      author:      row.get(5)?,
      content:     row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<DailyRecord> {
    Ok(DailyRecord {
      record_id:   self.record_id,
      category:    self.category,
      resident_id: ResidentId::new(self.resident_id),
      date:        decode_date(&self.date)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      author:      self.author,
      content:     self.content,
    })
  }
}
