//! Temporary identity resolution.
//!
//! Optimistic creates get a `temp-<n>` identity. When the create is confirmed
//! the placeholder is found again by position and given the server identity.

use crate::{
  Error, Result,
  event::{Event, EventId, Slot},
  store::EventSet,
};

#[derive(Debug, Default)]
pub struct PlaceholderResolver {
  next: u64,
}

impl PlaceholderResolver {
  pub fn new() -> Self { Self::default() }

  /// Allocate a fresh placeholder identity. Suffixes are monotonic for the
  /// lifetime of the resolver, across date changes.
  pub fn issue(&mut self) -> EventId {
    self.next += 1;
    EventId::placeholder(self.next)
  }
}

/// Swap a placeholder in `events` for its confirmed counterpart.
///
/// The placeholder is located positionally: it must still occupy `slot` and
/// still carry `placeholder` as its identity. When the local value is the one
/// the create sent (`sent`), the server entity is taken verbatim. When a later
/// edit has changed it, only identity and provenance are adopted so that the
/// pending edit stays visible until it settles itself.
pub fn reconcile(
  events: &EventSet,
  slot: &Slot,
  placeholder: &EventId,
  sent: Option<&Event>,
  confirmed: &Event,
) -> Result<EventSet> {
  let local = events
    .get(slot)
    .filter(|e| &e.id == placeholder)
    .ok_or_else(|| Error::PlaceholderUnresolved(placeholder.clone()))?;

  let untouched = sent.is_some_and(|s| s.value == local.value);
  let merged = if untouched && confirmed.slot() == *slot {
    confirmed.clone()
  } else {
    Event {
      id: confirmed.id.clone(),
      created_by: confirmed.created_by.clone(),
      created_at: confirmed.created_at,
      updated_at: confirmed.updated_at,
      ..local.clone()
    }
  };

  let mut next = events.clone();
  next.put(merged);
  Ok(next)
}
