//! The Event Store: every event for the selected date, as an immutable set.
//!
//! There is no partial-update API. Writers build the next full [`EventSet`]
//! and hand it to [`EventStore::replace`], which swaps it in atomically and
//! republishes the grid projection.

use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use tokio::sync::watch;

use crate::{
  event::{Event, EventId, Slot},
  grid::{Grid, project},
};

// ─── EventSet ────────────────────────────────────────────────────────────────

/// Events keyed by slot; at most one event per slot by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSet {
  slots: BTreeMap<Slot, Event>,
}

impl EventSet {
  pub fn new() -> Self { Self::default() }

  /// Build a set from a fetched list. When several events share a slot the
  /// most recently updated one is kept; ties go to the later list entry.
  pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
    let mut slots: BTreeMap<Slot, Event> = BTreeMap::new();
    for event in events {
      let slot = event.slot();
      match slots.get(&slot) {
        Some(kept) if kept.updated_at > event.updated_at => {}
        _ => {
          slots.insert(slot, event);
        }
      }
    }
    Self { slots }
  }

  pub fn get(&self, slot: &Slot) -> Option<&Event> { self.slots.get(slot) }

  pub fn find(&self, id: &EventId) -> Option<&Event> {
    self.slots.values().find(|e| &e.id == id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Event> { self.slots.values() }

  pub fn len(&self) -> usize { self.slots.len() }

  pub fn is_empty(&self) -> bool { self.slots.is_empty() }

  /// Put `event` into its slot, returning whatever it displaced.
  pub fn put(&mut self, event: Event) -> Option<Event> {
    self.slots.insert(event.slot(), event)
  }

  pub fn take(&mut self, slot: &Slot) -> Option<Event> { self.slots.remove(slot) }
}

impl FromIterator<Event> for EventSet {
  fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self { Self::from_events(iter) }
}

// ─── EventStore ──────────────────────────────────────────────────────────────

/// Holder of the current [`EventSet`] for one date.
///
/// Readers get `Arc` snapshots that never change underneath them. The grid
/// projection is recomputed on every replace and pushed to subscribers.
pub struct EventStore {
  date:    NaiveDate,
  current: Arc<EventSet>,
  view:    watch::Sender<Arc<Grid>>,
}

impl EventStore {
  pub fn new(date: NaiveDate) -> Self {
    let (view, _) = watch::channel(Arc::new(Grid::empty(date)));
    Self { date, current: Arc::new(EventSet::new()), view }
  }

  pub fn date(&self) -> NaiveDate { self.date }

  pub fn snapshot(&self) -> Arc<EventSet> { Arc::clone(&self.current) }

  /// Atomically swap in `events` and republish the projection.
  pub fn replace(&mut self, events: EventSet) {
    self.current = Arc::new(events);
    self.publish();
  }

  /// Discard everything and start over for `date`.
  pub fn reset(&mut self, date: NaiveDate) {
    self.date = date;
    self.current = Arc::new(EventSet::new());
    self.publish();
  }

  pub fn subscribe(&self) -> watch::Receiver<Arc<Grid>> { self.view.subscribe() }

  /// The most recently published projection.
  pub fn grid(&self) -> Arc<Grid> { Arc::clone(&self.view.borrow()) }

  fn publish(&self) {
    let grid = project(self.date, &self.current);
    self.view.send_replace(Arc::new(grid));
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::{
    event::{FacetValue, Hour, ResidentId},
    testing::{date, stamp},
  };

  #[test]
  fn duplicates_collapse_to_latest_update() {
    let older = stamp("a", "R1", 9, "T");
    let mut newer = stamp("b", "R1", 9, "U");
    newer.updated_at = older.updated_at + Duration::minutes(5);

    let set = EventSet::from_events([newer.clone(), older]);
    assert_eq!(set.len(), 1);
    assert_eq!(set.get(&newer.slot()), Some(&newer));
  }

  #[test]
  fn put_replaces_within_slot() {
    let mut set = EventSet::new();
    let first = stamp("a", "R1", 9, "T");
    let second = stamp("b", "R1", 9, "U");
    assert!(set.put(first.clone()).is_none());
    assert_eq!(set.put(second), Some(first));
    assert_eq!(set.len(), 1);
  }

  #[test]
  fn replace_republishes_projection() {
    let mut store = EventStore::new(date());
    let rx = store.subscribe();
    assert!(rx.borrow().is_empty());

    store.replace(EventSet::from_events([stamp("a", "R1", 9, "T")]));

    let grid = rx.borrow().clone();
    let cell = grid.cell(&ResidentId::new("R1"), Hour::new(9).unwrap()).unwrap();
    assert_eq!(
      cell.stamp.as_ref().map(|e| &e.value),
      Some(&FacetValue::Stamp("T".into()))
    );
  }

  #[test]
  fn snapshots_are_immutable() {
    let mut store = EventStore::new(date());
    let before = store.snapshot();
    store.replace(EventSet::from_events([stamp("a", "R1", 9, "T")]));
    assert!(before.is_empty());
    assert_eq!(store.snapshot().len(), 1);
  }

  #[test]
  fn reset_switches_date_and_clears() {
    let mut store = EventStore::new(date());
    store.replace(EventSet::from_events([stamp("a", "R1", 9, "T")]));
    let next = date().succ_opt().unwrap();
    store.reset(next);
    assert_eq!(store.date(), next);
    assert!(store.snapshot().is_empty());
    assert_eq!(store.grid().date, next);
  }
}
