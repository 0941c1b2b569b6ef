//! Grid projection: resident × hour × facet, derived from an [`EventSet`].
//!
//! The grid is never stored or edited; it is recomputed from the store on
//! every change.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::{
  event::{Event, FacetKind, Hour, ResidentId, Slot},
  store::EventSet,
};

/// Up to three events sharing one `(resident, hour)` cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
  pub stamp:    Option<Event>,
  pub position: Option<Event>,
  pub note:     Option<Event>,
}

impl Cell {
  pub fn get(&self, facet: FacetKind) -> Option<&Event> {
    match facet {
      FacetKind::PresenceStamp => self.stamp.as_ref(),
      FacetKind::CategoricalValue => self.position.as_ref(),
      FacetKind::FreeTextNote => self.note.as_ref(),
    }
  }

  fn slot_mut(&mut self, facet: FacetKind) -> &mut Option<Event> {
    match facet {
      FacetKind::PresenceStamp => &mut self.stamp,
      FacetKind::CategoricalValue => &mut self.position,
      FacetKind::FreeTextNote => &mut self.note,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.stamp.is_none() && self.position.is_none() && self.note.is_none()
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
  pub date: NaiveDate,
  rows:     BTreeMap<ResidentId, BTreeMap<Hour, Cell>>,
}

impl Grid {
  pub fn empty(date: NaiveDate) -> Self { Self { date, rows: BTreeMap::new() } }

  pub fn cell(&self, resident_id: &ResidentId, hour: Hour) -> Option<&Cell> {
    self.rows.get(resident_id)?.get(&hour)
  }

  pub fn event(&self, slot: &Slot) -> Option<&Event> {
    self.cell(&slot.resident_id, slot.hour)?.get(slot.facet)
  }

  pub fn row(&self, resident_id: &ResidentId) -> Option<&BTreeMap<Hour, Cell>> {
    self.rows.get(resident_id)
  }

  /// Residents that have at least one event on this date.
  pub fn residents(&self) -> impl Iterator<Item = &ResidentId> { self.rows.keys() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }
}

/// Project `events` into a grid for `date`.
pub fn project(date: NaiveDate, events: &EventSet) -> Grid {
  let mut rows: BTreeMap<ResidentId, BTreeMap<Hour, Cell>> = BTreeMap::new();
  for event in events.iter() {
    let cell = rows
      .entry(event.resident_id.clone())
      .or_default()
      .entry(event.hour)
      .or_default();
    *cell.slot_mut(event.facet()) = Some(event.clone());
  }
  Grid { date, rows }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    event::{FacetValue, Position},
    testing::{date, note, position, stamp},
  };

  #[test]
  fn facets_land_in_their_own_cell_field() {
    let events = EventSet::from_events([
      stamp("a", "R1", 9, "T"),
      position("b", "R1", 9, Position::Left),
      note("c", "R1", 9, "restless"),
      stamp("d", "R2", 10, "U"),
    ]);
    let grid = project(date(), &events);

    let r1 = ResidentId::new("R1");
    let cell = grid.cell(&r1, Hour::new(9).unwrap()).unwrap();
    assert_eq!(cell.stamp.as_ref().unwrap().value, FacetValue::Stamp("T".into()));
    assert_eq!(
      cell.position.as_ref().unwrap().value,
      FacetValue::Position(Position::Left)
    );
    assert_eq!(cell.note.as_ref().unwrap().value, FacetValue::Note("restless".into()));

    assert!(grid.cell(&r1, Hour::new(10).unwrap()).is_none());
    assert_eq!(grid.residents().count(), 2);
  }

  #[test]
  fn projection_is_deterministic() {
    let events = EventSet::from_events([
      stamp("a", "R1", 9, "T"),
      note("c", "R2", 3, "slept"),
    ]);
    assert_eq!(project(date(), &events), project(date(), &events));
  }

  #[test]
  fn event_lookup_by_slot() {
    let ev = note("c", "R3", 3, "tremor");
    let grid = project(date(), &EventSet::from_events([ev.clone()]));
    assert_eq!(grid.event(&ev.slot()), Some(&ev));
  }
}
