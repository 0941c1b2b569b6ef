//! Bookkeeping for in-flight optimistic mutations.
//!
//! Writes to the same key (a grid slot, a daily-record row) are queued and
//! reach the server one at a time, in the order they were started. Each key
//! with writes outstanding carries a [`Lane`]: what the server is known to
//! hold for it, as far as the writes settled so far tell.

use std::{
  collections::{BTreeMap, HashMap, hash_map::Entry},
  hash::Hash,
  sync::Arc,
};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::event::{Event, EventId, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
  Create,
  Update,
  Delete,
  /// Delete of the occupant followed by a create in the same slot.
  Replace,
}

impl MutationKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Create => "create",
      Self::Update => "update",
      Self::Delete => "delete",
      Self::Replace => "replace",
    }
  }
}

// ─── Lanes ───────────────────────────────────────────────────────────────────

/// The server's value for one key, shared by every write queued on it.
#[derive(Debug)]
pub struct Lane<V>(Arc<Mutex<V>>);

impl<V> Clone for Lane<V> {
  fn clone(&self) -> Self { Self(Arc::clone(&self.0)) }
}

impl<V: Clone> Lane<V> {
  fn new(value: V) -> Self { Self(Arc::new(Mutex::new(value))) }

  pub fn settled(&self) -> V { self.0.lock().clone() }

  /// Record a value the server has acknowledged.
  pub fn record(&self, value: V) { *self.0.lock() = value; }

  fn same(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}

/// A write's place in its key's queue. Dropping it lets the next write run.
#[derive(Debug)]
pub struct Turn {
  previous: Option<oneshot::Receiver<()>>,
  _done:    oneshot::Sender<()>,
}

impl Turn {
  /// Wait until every earlier write on the same key has settled.
  pub async fn ready(&mut self) {
    if let Some(previous) = self.previous.take() {
      // The sender is only ever dropped, never used.
      let _ = previous.await;
    }
  }
}

#[derive(Debug)]
struct Queue<V> {
  latest:      u64,
  outstanding: usize,
  lane:        Lane<V>,
  tail:        oneshot::Receiver<()>,
}

/// Outstanding writes per key.
#[derive(Debug)]
pub struct Queues<K, V> {
  queues: HashMap<K, Queue<V>>,
}

impl<K, V> Default for Queues<K, V> {
  fn default() -> Self { Self { queues: HashMap::new() } }
}

impl<K, V> Queues<K, V>
where
  K: Eq + Hash,
  V: Clone,
{
  /// Queue write `seq` on `key`. When nothing is outstanding on the key, its
  /// lane starts from `seed`, the value shown locally before this write.
  pub fn join(&mut self, key: K, seq: u64, seed: impl FnOnce() -> V) -> (Lane<V>, Turn) {
    let (done, tail) = oneshot::channel();
    match self.queues.entry(key) {
      Entry::Occupied(mut entry) => {
        let queue = entry.get_mut();
        queue.latest = seq;
        queue.outstanding += 1;
        let previous = std::mem::replace(&mut queue.tail, tail);
        (queue.lane.clone(), Turn { previous: Some(previous), _done: done })
      }
      Entry::Vacant(entry) => {
        let lane = Lane::new(seed());
        entry.insert(Queue { latest: seq, outstanding: 1, lane: lane.clone(), tail });
        (lane, Turn { previous: None, _done: done })
      }
    }
  }

  /// Whether a write on `key` was queued after `seq`.
  pub fn superseded(&self, key: &K, seq: u64) -> bool {
    self.queues.get(key).is_some_and(|q| q.latest > seq)
  }

  /// Take one write off `key`. Writes from before a [`clear`](Self::clear)
  /// hold a lane that is no longer current and are ignored.
  pub fn leave(&mut self, key: &K, lane: &Lane<V>) {
    let Some(queue) = self.queues.get_mut(key) else { return };
    if !queue.lane.same(lane) {
      return;
    }
    queue.outstanding -= 1;
    if queue.outstanding == 0 {
      self.queues.remove(key);
    }
  }

  pub fn clear(&mut self) { self.queues.clear(); }
}

// ─── Grid mutations ──────────────────────────────────────────────────────────

/// One optimistic operation between its local apply and its remote outcome.
#[derive(Debug)]
pub struct PendingMutation {
  pub seq:         u64,
  /// Date epoch the mutation was applied in; outcomes from an older epoch are
  /// dropped.
  pub epoch:       u64,
  pub kind:        MutationKind,
  pub slot:        Slot,
  /// What this mutation installed in `slot` (`None` for deletes).
  pub after:       Option<Event>,
  /// Placeholder identity of the created event, used to match the
  /// confirmation back to it.
  pub placeholder: Option<EventId>,
  /// The slot's server-side occupant.
  pub lane:        Lane<Option<Event>>,
}

/// In-flight mutations, in the order they were started, queued per slot.
#[derive(Debug, Default)]
pub struct PendingTable {
  next:      u64,
  in_flight: BTreeMap<u64, Slot>,
  queues:    Queues<Slot, Option<Event>>,
}

impl PendingTable {
  /// Reserve the next sequence number and queue it on `slot`. `occupant` is
  /// the slot's local occupant before the mutation is applied.
  pub fn begin(
    &mut self,
    slot: Slot,
    occupant: Option<&Event>,
  ) -> (u64, Lane<Option<Event>>, Turn) {
    self.next += 1;
    let seq = self.next;
    self.in_flight.insert(seq, slot.clone());
    let (lane, turn) = self.queues.join(slot, seq, || occupant.cloned());
    (seq, lane, turn)
  }

  pub fn finish(&mut self, mutation: &PendingMutation) {
    if self.in_flight.remove(&mutation.seq).is_some() {
      self.queues.leave(&mutation.slot, &mutation.lane);
    }
  }

  pub fn len(&self) -> usize { self.in_flight.len() }

  pub fn is_empty(&self) -> bool { self.in_flight.is_empty() }

  /// Whether any mutation on `slot` was started after `seq` and is still
  /// outstanding.
  pub fn superseded(&self, slot: &Slot, seq: u64) -> bool { self.queues.superseded(slot, seq) }

  /// Slots with at least one mutation in flight. May repeat a slot.
  pub fn slots(&self) -> impl Iterator<Item = &Slot> { self.in_flight.values() }

  /// Forget everything except the sequence counter.
  pub fn clear(&mut self) {
    self.in_flight.clear();
    self.queues.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    event::{FacetKind, Hour, ResidentId},
    testing::position,
  };

  fn slot(r: &str, h: u8) -> Slot {
    Slot::new(ResidentId::new(r), Hour::new(h).unwrap(), FacetKind::CategoricalValue)
  }

  #[test]
  fn later_mutations_on_same_slot_share_a_lane() {
    let mut t = PendingTable::default();
    let seeded = position("srv-1", "R2", 14, crate::event::Position::Left);
    let (a, lane_a, _) = t.begin(slot("R2", 14), Some(&seeded));
    let _other = t.begin(slot("R1", 9), None);
    assert!(!t.superseded(&slot("R2", 14), a));

    let (b, lane_b, _) = t.begin(slot("R2", 14), None);
    assert!(t.superseded(&slot("R2", 14), a));
    assert!(!t.superseded(&slot("R2", 14), b));

    // The lane keeps the occupant from before the first mutation.
    assert_eq!(lane_b.settled(), Some(seeded));
    lane_a.record(None);
    assert_eq!(lane_b.settled(), None);
    assert_eq!(t.len(), 3);
  }

  #[tokio::test]
  async fn writes_on_one_key_run_in_order() {
    let mut q: Queues<&str, u32> = Queues::default();
    let (lane, first) = q.join("m-1", 1, || 0);
    let (_, mut second) = q.join("m-1", 2, || 99);
    let (_, mut unrelated) = q.join("o-1", 3, || 0);

    unrelated.ready().await;
    let waiting = tokio::spawn(async move {
      second.ready().await;
    });
    tokio::task::yield_now().await;
    assert!(!waiting.is_finished());

    lane.record(7);
    drop(first);
    waiting.await.unwrap();
    assert_eq!(lane.settled(), 7);
  }

  #[test]
  fn key_is_forgotten_once_nothing_is_outstanding() {
    let mut q: Queues<&str, u32> = Queues::default();
    let (first, _t1) = q.join("m-1", 1, || 5);
    let (second, _t2) = q.join("m-1", 2, || 0);
    q.leave(&"m-1", &first);
    assert!(q.superseded(&"m-1", 1));
    q.leave(&"m-1", &second);
    assert!(!q.superseded(&"m-1", 1));

    // A fresh queue starts from the new seed.
    let (fresh, _t3) = q.join("m-1", 3, || 8);
    assert_eq!(fresh.settled(), 8);

    // Leaving with a lane from before a clear changes nothing.
    q.clear();
    let (_current, _t4) = q.join("m-1", 4, || 1);
    let (_, _t5) = q.join("m-1", 5, || 1);
    q.leave(&"m-1", &fresh);
    assert!(q.superseded(&"m-1", 4));
  }
}
