//! The optimistic mutation coordinator.
//!
//! Every gesture runs in three phases:
//!
//! 1. Cancel: bump the fetch generation so any fetch already in flight is
//!    discarded when it returns.
//! 2. Apply: snapshot the store, install the optimistic result (with a
//!    placeholder identity for creates) and republish the grid. This happens
//!    synchronously inside the gesture method, before it returns.
//! 3. Settle: the returned [`Settlement`] performs the remote calls. On
//!    success the placeholder is swapped for the confirmed entity; on failure
//!    the affected slot is rolled back and a [`Notice`] is pushed.
//!
//! Mutations on the same slot settle one at a time, in the order they were
//! applied. Each one picks its requests against what the server is known to
//! hold in the slot when its turn comes, so an update never carries a `temp-`
//! id and a create never lands next to an occupant an earlier failed delete
//! left behind.
//!
//! Rollback only ever touches the mutation's own slot, and only once no later
//! mutation on that slot is outstanding. The slot then shows the last occupant
//! the server acknowledged.

use std::{future::Future, pin::Pin, sync::Arc};

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  event::{
    Event, EventId, EventPatch, FacetKind, FacetValue, Hour, NewEvent, Position, ResidentId,
    Slot,
  },
  grid::Grid,
  notice::{Notice, Notices},
  pending::{MutationKind, PendingMutation, PendingTable, Turn},
  remote::CareRemote,
  resolver::{PlaceholderResolver, reconcile},
  store::{EventSet, EventStore},
};

/// The remote phase of a gesture. Resolves once every request the gesture
/// needed has settled and the local state has been reconciled or rolled back.
///
/// Dropping it abandons the remote phase; the optimistic state stays and
/// later mutations on the same slot go ahead.
pub type Settlement = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// What a [`Coordinator::refresh`] did with the fetched events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  Installed { events: usize },
  /// A mutation or date change happened while the fetch was in flight.
  Discarded,
}

// ─── Plans ───────────────────────────────────────────────────────────────────

/// What a mutation wants the slot to hold on the server. The requests that
/// achieve it are chosen only when the mutation reaches the front of its
/// slot's queue, against the occupant the server is known to hold by then.
enum Intent {
  /// No occupant.
  Clear,
  /// `input` as the only occupant. Whatever is there is deleted first.
  Put { input: NewEvent },
  /// The current occupant, with its note rewritten.
  Edit { patch: EventPatch },
}

struct Plan {
  mutation: PendingMutation,
  intent:   Intent,
  turn:     Turn,
}

// ─── State ───────────────────────────────────────────────────────────────────

struct State {
  store:    EventStore,
  /// Bumped on every date change.
  epoch:    u64,
  /// Bumped on every mutation and date change.
  fetches:  u64,
  resolver: PlaceholderResolver,
  pending:  PendingTable,
}

impl State {
  /// Phases one and two for a single slot.
  fn begin(
    &mut self,
    kind: MutationKind,
    slot: Slot,
    after: Option<Event>,
    intent: Intent,
  ) -> Plan {
    self.fetches += 1;
    let snapshot = self.store.snapshot();
    let (seq, lane, turn) = self.pending.begin(slot.clone(), snapshot.get(&slot));

    let mut next = (*snapshot).clone();
    match &after {
      Some(event) => {
        next.put(event.clone());
      }
      None => {
        next.take(&slot);
      }
    }
    self.store.replace(next);

    let placeholder = match &intent {
      Intent::Put { .. } => after.as_ref().map(|e| e.id.clone()),
      _ => None,
    };
    let mutation =
      PendingMutation { seq, epoch: self.epoch, kind, slot, after, placeholder, lane };
    Plan { mutation, intent, turn }
  }

  fn placeholder(&mut self, slot: &Slot, value: FacetValue, actor: String) -> (Event, NewEvent) {
    let now = Utc::now();
    let date = self.store.date();
    let event = Event {
      id: self.resolver.issue(),
      resident_id: slot.resident_id.clone(),
      date,
      hour: slot.hour,
      value: value.clone(),
      created_by: actor.clone(),
      created_at: now,
      updated_at: now,
    };
    let input = NewEvent {
      resident_id: slot.resident_id.clone(),
      date,
      hour: slot.hour,
      value,
      actor,
    };
    (event, input)
  }

  fn stage_create(&mut self, slot: Slot, value: FacetValue, actor: String) -> Plan {
    let (event, input) = self.placeholder(&slot, value, actor);
    self.begin(MutationKind::Create, slot, Some(event), Intent::Put { input })
  }

  fn stage_delete(&mut self, existing: &Event) -> Plan {
    self.begin(MutationKind::Delete, existing.slot(), None, Intent::Clear)
  }

  fn stage_replace(&mut self, existing: &Event, value: FacetValue, actor: String) -> Plan {
    let slot = existing.slot();
    let (event, input) = self.placeholder(&slot, value, actor);
    self.begin(MutationKind::Replace, slot, Some(event), Intent::Put { input })
  }

  fn stage_update(&mut self, existing: &Event, text: &str) -> Plan {
    let mut edited = existing.clone();
    edited.value = FacetValue::Note(text.to_owned());
    edited.updated_at = Utc::now();
    let patch = EventPatch { note: text.to_owned() };
    self.begin(MutationKind::Update, existing.slot(), Some(edited), Intent::Edit { patch })
  }
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

pub struct Coordinator<R> {
  remote:  Arc<R>,
  state:   Mutex<State>,
  notices: Notices,
}

impl<R> Coordinator<R>
where
  R: CareRemote + 'static,
{
  /// A coordinator for `date` with an empty store. Call
  /// [`refresh`](Self::refresh) to load it.
  pub fn new(remote: Arc<R>, date: NaiveDate) -> Arc<Self> {
    Self::with_notices(remote, date, Notices::new())
  }

  pub fn with_notices(remote: Arc<R>, date: NaiveDate, notices: Notices) -> Arc<Self> {
    Arc::new(Self {
      remote,
      state: Mutex::new(State {
        store:    EventStore::new(date),
        epoch:    0,
        fetches:  0,
        resolver: PlaceholderResolver::new(),
        pending:  PendingTable::default(),
      }),
      notices,
    })
  }

  pub fn date(&self) -> NaiveDate { self.state.lock().store.date() }

  pub fn snapshot(&self) -> Arc<EventSet> { self.state.lock().store.snapshot() }

  pub fn grid(&self) -> Arc<Grid> { self.state.lock().store.grid() }

  /// Receives a fresh projection after every change to the store.
  pub fn subscribe(&self) -> watch::Receiver<Arc<Grid>> { self.state.lock().store.subscribe() }

  pub fn notices(&self) -> broadcast::Receiver<Notice> { self.notices.subscribe() }

  /// Mutations applied locally whose remote outcome is still outstanding.
  pub fn pending(&self) -> usize { self.state.lock().pending.len() }

  // ── Loading ───────────────────────────────────────────────────────────

  /// Fetch the selected date and install the result, unless a mutation or
  /// date change happened in the meantime. Slots with mutations still in
  /// flight keep their local state.
  pub async fn refresh(&self) -> Result<FetchOutcome> {
    let (date, generation) = {
      let st = self.state.lock();
      (st.store.date(), st.fetches)
    };

    let fetched = self
      .remote
      .fetch_events(date)
      .await
      .map_err(|e| Error::RemoteReadFailed(e.to_string()))?;

    let mut st = self.state.lock();
    if st.fetches != generation || st.store.date() != date {
      debug!(%date, "{}", Error::StaleFetchDiscarded);
      return Ok(FetchOutcome::Discarded);
    }

    let mut next = EventSet::from_events(fetched.into_iter().filter(|e| e.date == date));
    let local = st.store.snapshot();
    for slot in st.pending.slots() {
      next.take(slot);
      if let Some(event) = local.get(slot) {
        next.put(event.clone());
      }
    }

    let events = next.len();
    st.store.replace(next);
    debug!(%date, events, "installed fetched events");
    Ok(FetchOutcome::Installed { events })
  }

  /// Switch to `date`. Every outcome still in flight for the previous date
  /// is dropped when it arrives.
  pub async fn select_date(&self, date: NaiveDate) -> Result<FetchOutcome> {
    {
      let mut st = self.state.lock();
      st.epoch += 1;
      st.fetches += 1;
      st.store.reset(date);
      st.pending.clear();
    }
    info!(%date, "selected date");
    self.refresh().await
  }

  // ── Gestures ──────────────────────────────────────────────────────────

  /// Remove the stamp if there is one, otherwise stamp as the current actor.
  pub fn toggle_stamp(self: &Arc<Self>, resident_id: &ResidentId, hour: Hour) -> Settlement {
    let slot = Slot::new(resident_id.clone(), hour, FacetKind::PresenceStamp);
    let actor = self.remote.current_actor();
    let plan = {
      let mut st = self.state.lock();
      let existing = st.store.snapshot().get(&slot).cloned();
      match existing {
        Some(existing) => st.stage_delete(&existing),
        None => st.stage_create(slot, FacetValue::Stamp(actor.clone()), actor),
      }
    };
    self.launch(Some(plan))
  }

  /// Set or clear the position. Setting always replaces the occupant, even
  /// with the same value.
  pub fn set_position(
    self: &Arc<Self>,
    resident_id: &ResidentId,
    hour: Hour,
    value: Option<Position>,
  ) -> Settlement {
    let slot = Slot::new(resident_id.clone(), hour, FacetKind::CategoricalValue);
    let actor = self.remote.current_actor();
    let plan = {
      let mut st = self.state.lock();
      let existing = st.store.snapshot().get(&slot).cloned();
      match (existing, value) {
        (None, None) => None,
        (Some(existing), None) => Some(st.stage_delete(&existing)),
        (None, Some(p)) => Some(st.stage_create(slot.clone(), FacetValue::Position(p), actor)),
        (Some(existing), Some(p)) => {
          Some(st.stage_replace(&existing, FacetValue::Position(p), actor))
        }
      }
    };
    if plan.is_none() {
      debug!(%slot, "nothing to clear");
    }
    self.launch(plan)
  }

  /// Write the note for a cell. Empty (or blank) text deletes it.
  pub fn set_note(self: &Arc<Self>, resident_id: &ResidentId, hour: Hour, text: &str) -> Settlement {
    let slot = Slot::new(resident_id.clone(), hour, FacetKind::FreeTextNote);
    let actor = self.remote.current_actor();
    let blank = text.trim().is_empty();
    let plan = {
      let mut st = self.state.lock();
      let existing = st.store.snapshot().get(&slot).cloned();
      match existing {
        Some(existing) if blank => Some(st.stage_delete(&existing)),
        Some(existing) => Some(st.stage_update(&existing, text)),
        None if blank => None,
        None => Some(st.stage_create(slot.clone(), FacetValue::Note(text.to_owned()), actor)),
      }
    };
    if plan.is_none() {
      debug!(%slot, "blank note on empty cell");
    }
    self.launch(plan)
  }

  /// Delete an event by identity, whatever its facet.
  pub fn delete_event(self: &Arc<Self>, id: &EventId) -> Settlement {
    let plan = {
      let mut st = self.state.lock();
      let existing = st.store.snapshot().find(id).cloned();
      existing.map(|existing| st.stage_delete(&existing))
    };
    match plan {
      Some(plan) => self.launch(Some(plan)),
      None => Box::pin(std::future::ready(Err(Error::EventNotFound(id.clone())))),
    }
  }

  fn launch(self: &Arc<Self>, plan: Option<Plan>) -> Settlement {
    let this = Arc::clone(self);
    Box::pin(async move {
      match plan {
        Some(plan) => this.settle(plan).await,
        None => Ok(()),
      }
    })
  }

  // ── Settling ──────────────────────────────────────────────────────────

  async fn settle(self: Arc<Self>, plan: Plan) -> Result<()> {
    let Plan { mutation, intent, mut turn } = plan;
    turn.ready().await;
    let outcome = self.send(&mutation, intent).await;
    self.conclude(&mutation, outcome)
  }

  /// Issue the requests for `intent`, recording each acknowledged change in
  /// the slot's lane. Returns the created entity for a put.
  async fn send(
    &self,
    mutation: &PendingMutation,
    intent: Intent,
  ) -> Result<Option<Event>, R::Error> {
    let lane = &mutation.lane;
    match intent {
      Intent::Clear => {
        match lane.settled() {
          Some(occupant) => {
            self.remote.delete_event(occupant.id).await?;
            lane.record(None);
          }
          None => debug!(slot = %mutation.slot, "nothing on the server to delete"),
        }
        Ok(None)
      }

      Intent::Put { input } => {
        if let Some(occupant) = lane.settled() {
          self.remote.delete_event(occupant.id).await?;
          lane.record(None);
        }
        let confirmed = self.remote.create_event(input).await?;
        lane.record(Some(confirmed.clone()));
        Ok(Some(confirmed))
      }

      Intent::Edit { patch } => {
        let Some(occupant) = lane.settled() else {
          debug!(slot = %mutation.slot, "edited event was never created");
          return Ok(None);
        };
        let confirmed = self.remote.update_event(occupant.id, patch).await?;
        lane.record(Some(confirmed));
        Ok(None)
      }
    }
  }

  /// Bring the local slot in line with the outcome and finish the mutation.
  ///
  /// The newest mutation on a slot shows whatever the server is known to hold
  /// once it settles, success or failure. An older one leaves the slot to the
  /// newer mutation, apart from handing a confirmed identity to a placeholder
  /// that is still on screen.
  fn conclude(
    &self,
    mutation: &PendingMutation,
    outcome: Result<Option<Event>, R::Error>,
  ) -> Result<()> {
    let slot = &mutation.slot;
    let operation = mutation.kind.as_str();
    let current_epoch = {
      let mut st = self.state.lock();
      let current_epoch = mutation.epoch == st.epoch;
      let superseded = st.pending.superseded(slot, mutation.seq);
      st.pending.finish(mutation);

      if current_epoch {
        let current = st.store.snapshot();
        if !superseded {
          let mut next = (*current).clone();
          match mutation.lane.settled() {
            Some(occupant) => {
              next.put(occupant);
            }
            None => {
              next.take(slot);
            }
          }
          st.store.replace(next);
        } else if let (Ok(Some(confirmed)), Some(placeholder)) = (&outcome, &mutation.placeholder) {
          match reconcile(&current, slot, placeholder, mutation.after.as_ref(), confirmed) {
            Ok(next) => st.store.replace(next),
            Err(err) => debug!(%err, id = %confirmed.id, "confirmed entity discarded"),
          }
        }
        if let Err(err) = &outcome {
          warn!(%slot, operation, superseded, error = %err, "remote write failed");
        }
      } else {
        debug!(%slot, operation, "outcome for a previous date dropped");
      }
      current_epoch
    };

    let Err(err) = outcome else {
      return Ok(());
    };
    let message = err.to_string();
    if current_epoch {
      self.notices.push(Notice::WriteFailed { slot: Some(slot.clone()), message: message.clone() });
    }
    Err(Error::RemoteWriteFailed { operation, message })
  }
}
