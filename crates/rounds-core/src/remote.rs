//! The `CareRemote` trait: everything the client-side engine consumes from
//! the outside world.
//!
//! Implemented by the HTTP client in `rounds-cli` and by scripted fakes in
//! tests. The engine never assumes anything about transport beyond a
//! success/failure outcome per call.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  dispatch::RecordUpdate,
  event::{Event, EventId, EventPatch, NewEvent},
  record::DailyRecord,
};

pub trait CareRemote: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Events ────────────────────────────────────────────────────────────

  /// All events for `date`. Order is not significant.
  fn fetch_events(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Create an event and return the confirmed entity.
  fn create_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Patch a confirmed (never placeholder) event.
  fn update_event(
    &self,
    id: EventId,
    patch: EventPatch,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  fn delete_event(
    &self,
    id: EventId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Daily records ─────────────────────────────────────────────────────

  fn fetch_daily_records(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DailyRecord>, Self::Error>> + Send + '_;

  /// Send an already-dispatched content update.
  fn update_record(
    &self,
    update: RecordUpdate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Identity ──────────────────────────────────────────────────────────

  /// Short display token of the signed-in staff member. Used as the stamp
  /// value and as the author of new notes.
  fn current_actor(&self) -> String;
}
