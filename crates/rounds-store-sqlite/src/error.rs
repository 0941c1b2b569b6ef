//! Error type for `rounds-store-sqlite`.

use rounds_core::{dispatch::ContentField, event::EventId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] rounds_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Only notes can be patched.
  #[error("event {0} is not a note")]
  NotANote(EventId),

  /// The update names a field the resource does not store content in.
  #[error("{resource} does not use field {field}")]
  FieldMismatch {
    resource: &'static str,
    field:    ContentField,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
