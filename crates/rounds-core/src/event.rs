//! Event types: the atomic unit of a care observation.
//!
//! An event occupies one facet of one hourly cell for one resident. At most
//! one event exists per [`Slot`]; putting a second event into an occupied slot
//! is a replacement, never a merge.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix that marks an identity as locally generated and unconfirmed.
pub const PLACEHOLDER_PREFIX: &str = "temp-";

// ─── Identity ────────────────────────────────────────────────────────────────

/// Identifier of the resident an event concerns. Opaque to this crate.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ResidentId(pub String);

impl ResidentId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ResidentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Event identity: either a durable server-issued id or a `temp-` placeholder.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  /// Build a placeholder identity from a locally unique suffix.
  pub fn placeholder(suffix: impl fmt::Display) -> Self {
    Self(format!("{PLACEHOLDER_PREFIX}{suffix}"))
  }

  pub fn is_placeholder(&self) -> bool { self.0.starts_with(PLACEHOLDER_PREFIX) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for EventId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Hour ────────────────────────────────────────────────────────────────────

/// An hour bucket in `0..=23`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Hour(u8);

impl Hour {
  pub const COUNT: u8 = 24;

  pub fn new(hour: u8) -> Result<Self> {
    if hour < Self::COUNT {
      Ok(Self(hour))
    } else {
      Err(Error::InvalidHour(hour))
    }
  }

  pub fn get(self) -> u8 { self.0 }

  /// Every hour of the day, in order.
  pub fn all() -> impl Iterator<Item = Hour> { (0..Self::COUNT).map(Hour) }
}

impl TryFrom<u8> for Hour {
  type Error = Error;

  fn try_from(value: u8) -> Result<Self> { Self::new(value) }
}

impl From<Hour> for u8 {
  fn from(hour: Hour) -> u8 { hour.0 }
}

impl fmt::Display for Hour {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}", self.0)
  }
}

// ─── Facets ──────────────────────────────────────────────────────────────────

/// Body position recorded by a position-change round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
  Left,
  Right,
  Supine,
}

impl Position {
  pub const ALL: [Position; 3] = [Self::Left, Self::Right, Self::Supine];

  /// The glyph shown in the grid.
  pub fn glyph(self) -> &'static str {
    match self {
      Self::Left => "左",
      Self::Right => "右",
      Self::Supine => "仰",
    }
  }
}

impl FromStr for Position {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim() {
      "左" | "left" => Ok(Self::Left),
      "右" | "right" => Ok(Self::Right),
      "仰" | "supine" => Ok(Self::Supine),
      other => Err(Error::UnknownPosition(other.to_owned())),
    }
  }
}

impl fmt::Display for Position {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.glyph()) }
}

/// The three independently editable aspects of an hourly cell.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FacetKind {
  /// Patrol round: who looked in on the resident.
  PresenceStamp,
  /// Position change.
  CategoricalValue,
  /// Free-text notes.
  FreeTextNote,
}

impl FacetKind {
  pub const ALL: [FacetKind; 3] =
    [Self::PresenceStamp, Self::CategoricalValue, Self::FreeTextNote];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::PresenceStamp => "presence_stamp",
      Self::CategoricalValue => "categorical_value",
      Self::FreeTextNote => "free_text_note",
    }
  }
}

/// The typed payload of an event. The variant decides the [`FacetKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FacetValue {
  /// Short identifier of the staff member who made the round.
  Stamp(String),
  Position(Position),
  Note(String),
}

impl FacetValue {
  pub fn kind(&self) -> FacetKind {
    match self {
      Self::Stamp(_) => FacetKind::PresenceStamp,
      Self::Position(_) => FacetKind::CategoricalValue,
      Self::Note(_) => FacetKind::FreeTextNote,
    }
  }

  /// Text shown for this value in a grid cell.
  pub fn display(&self) -> &str {
    match self {
      Self::Stamp(s) | Self::Note(s) => s,
      Self::Position(p) => p.glyph(),
    }
  }
}

// ─── Slot ────────────────────────────────────────────────────────────────────

/// The `(resident, hour, facet)` tuple addressing one cell-facet. The date is
/// implied by the store the slot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Slot {
  pub resident_id: ResidentId,
  pub hour:        Hour,
  pub facet:       FacetKind,
}

impl Slot {
  pub fn new(resident_id: ResidentId, hour: Hour, facet: FacetKind) -> Self {
    Self { resident_id, hour, facet }
  }
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}@{}/{}", self.resident_id, self.hour, self.facet.as_str())
  }
}

// ─── Event ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
  pub id:          EventId,
  pub resident_id: ResidentId,
  pub date:        NaiveDate,
  pub hour:        Hour,
  pub value:       FacetValue,
  pub created_by:  String,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Event {
  pub fn facet(&self) -> FacetKind { self.value.kind() }

  pub fn slot(&self) -> Slot {
    Slot::new(self.resident_id.clone(), self.hour, self.facet())
  }
}

/// Input to a create request. Identity and timestamps are assigned by the
/// server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
  pub resident_id: ResidentId,
  pub date:        NaiveDate,
  pub hour:        Hour,
  pub value:       FacetValue,
  pub actor:       String,
}

/// Partial update. Notes are the only facet that is ever updated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
  pub note: String,
}
