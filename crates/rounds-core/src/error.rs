//! Error types for `rounds-core`.

use thiserror::Error;

use crate::event::EventId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("hour out of range: {0} (expected 0..=23)")]
  InvalidHour(u8),

  #[error("unknown position value: {0:?}")]
  UnknownPosition(String),

  #[error("unsupported record type: {0:?}")]
  UnsupportedRecordType(String),

  /// A create/update/delete was rejected or never reached the server. The
  /// local state has already been rolled back when this is returned.
  #[error("{operation} failed: {message}")]
  RemoteWriteFailed {
    operation: &'static str,
    message:   String,
  },

  #[error("fetch failed: {0}")]
  RemoteReadFailed(String),

  /// A fetch resolved after a later edit or a date change; its result was
  /// dropped.
  #[error("stale fetch discarded")]
  StaleFetchDiscarded,

  /// A confirmed entity arrived but its placeholder was already gone.
  #[error("placeholder {0} no longer present")]
  PlaceholderUnresolved(EventId),

  #[error("event not found: {0}")]
  EventNotFound(EventId),

  #[error("record not found: {0}")]
  RecordNotFound(String),
}

impl Error {
  /// Whether this error is meant to reach the user (as a transient notice).
  pub fn is_user_visible(&self) -> bool {
    matches!(
      self,
      Self::RemoteWriteFailed { .. } | Self::UnsupportedRecordType(_)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
