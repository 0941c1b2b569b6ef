//! The `CareRepository` trait: persistence for the server side.
//!
//! Implemented by storage backends (e.g. `rounds-store-sqlite`). The HTTP
//! layer in `rounds-api` depends on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  dispatch::{RecordCategory, RecordUpdate},
  event::{Event, EventId, EventPatch, NewEvent},
  record::{DailyRecord, NewRecord},
  resident::{NewResident, Resident},
};

/// Abstraction over a care-record store backend.
///
/// Identities are assigned by the backend. The uniqueness of a slot is not
/// enforced here; readers collapse duplicates.
pub trait CareRepository: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Residents ─────────────────────────────────────────────────────────

  fn add_resident(
    &self,
    input: NewResident,
  ) -> impl Future<Output = Result<Resident, Self::Error>> + Send + '_;

  /// All residents, ordered by room then name.
  fn list_residents(&self) -> impl Future<Output = Result<Vec<Resident>, Self::Error>> + Send + '_;

  // ── Events ────────────────────────────────────────────────────────────

  fn list_events(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<Event>, Self::Error>> + Send + '_;

  /// Returns `None` if not found.
  fn get_event(
    &self,
    id: EventId,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  fn create_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<Event, Self::Error>> + Send + '_;

  /// Rewrite a note. Returns `None` if the event does not exist; fails if it
  /// is not a note.
  fn update_event(
    &self,
    id: EventId,
    patch: EventPatch,
  ) -> impl Future<Output = Result<Option<Event>, Self::Error>> + Send + '_;

  /// Returns `false` if there was nothing to delete.
  fn delete_event(
    &self,
    id: EventId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Daily records ─────────────────────────────────────────────────────

  fn add_record(
    &self,
    category: RecordCategory,
    input: NewRecord,
  ) -> impl Future<Output = Result<DailyRecord, Self::Error>> + Send + '_;

  /// Apply a routed content update. Returns `None` if the record does not
  /// exist in `update.category`; fails if `update.field` is not that
  /// category's content field.
  fn update_record(
    &self,
    update: RecordUpdate,
  ) -> impl Future<Output = Result<Option<DailyRecord>, Self::Error>> + Send + '_;

  /// Every record of every category for `date`, ordered by `recorded_at`.
  fn daily_records(
    &self,
    date: NaiveDate,
  ) -> impl Future<Output = Result<Vec<DailyRecord>, Self::Error>> + Send + '_;
}
