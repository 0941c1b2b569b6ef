//! The daily view: one flat list of clinical records for a date, edited in
//! place.
//!
//! Edits are optimistic like grid gestures, but rows are independent: a
//! failed save reverts that row's content and nothing else. Saves to the same
//! row go out one at a time, and once the newest has settled the row shows the
//! last content the server accepted.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::{
  Error, Result,
  coordinator::{FetchOutcome, Settlement},
  dispatch::dispatch,
  notice::{Notice, Notices},
  pending::Queues,
  record::DailyRecord,
  remote::CareRemote,
};

struct State {
  date:       NaiveDate,
  /// Bumped by loads and edits; a load that sees a different value when it
  /// returns is discarded.
  generation: u64,
  /// Saves in flight per record id, with the content the server holds.
  saves:      Queues<String, String>,
}

pub struct DailyLog<R> {
  remote:  Arc<R>,
  state:   Mutex<State>,
  rows:    watch::Sender<Arc<Vec<DailyRecord>>>,
  notices: Notices,
}

impl<R> DailyLog<R>
where
  R: CareRemote + 'static,
{
  pub fn new(remote: Arc<R>, date: NaiveDate) -> Arc<Self> {
    Self::with_notices(remote, date, Notices::new())
  }

  pub fn with_notices(remote: Arc<R>, date: NaiveDate, notices: Notices) -> Arc<Self> {
    let (rows, _) = watch::channel(Arc::new(Vec::new()));
    let state = State { date, generation: 0, saves: Queues::default() };
    Arc::new(Self { remote, state: Mutex::new(state), rows, notices })
  }

  pub fn date(&self) -> NaiveDate { self.state.lock().date }

  pub fn rows(&self) -> Arc<Vec<DailyRecord>> { Arc::clone(&self.rows.borrow()) }

  pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<DailyRecord>>> { self.rows.subscribe() }

  pub fn notices(&self) -> broadcast::Receiver<Notice> { self.notices.subscribe() }

  /// Load every record for `date`, ordered by time of recording.
  pub async fn load(&self, date: NaiveDate) -> Result<FetchOutcome> {
    let generation = {
      let mut st = self.state.lock();
      if st.date != date {
        st.date = date;
        st.saves.clear();
        self.rows.send_replace(Arc::new(Vec::new()));
      }
      st.generation += 1;
      st.generation
    };

    let mut fetched = self
      .remote
      .fetch_daily_records(date)
      .await
      .map_err(|e| Error::RemoteReadFailed(e.to_string()))?;

    let st = self.state.lock();
    if st.generation != generation {
      debug!(%date, "{}", Error::StaleFetchDiscarded);
      return Ok(FetchOutcome::Discarded);
    }
    fetched.sort_by(|a, b| {
      a.recorded_at.cmp(&b.recorded_at).then_with(|| a.record_id.cmp(&b.record_id))
    });
    let events = fetched.len();
    self.rows.send_replace(Arc::new(fetched));
    Ok(FetchOutcome::Installed { events })
  }

  /// Replace the content of one row and save it to the row's own resource.
  ///
  /// A row whose category has no known resource is refused up front: no
  /// request is made and an [`Notice::UnsupportedRecordType`] is pushed.
  pub fn edit_content(self: &Arc<Self>, record_id: &str, content: &str) -> Settlement {
    let Some(row) = self.rows.borrow().iter().find(|r| r.record_id == record_id).cloned() else {
      return Box::pin(std::future::ready(Err(Error::RecordNotFound(record_id.to_owned()))));
    };

    let update = match dispatch(&row.category, record_id, content) {
      Ok(update) => update,
      Err(err) => {
        warn!(record_id, category = %row.category, "edit refused: unsupported record type");
        self.notices.push(Notice::UnsupportedRecordType { label: row.category.clone() });
        return Box::pin(std::future::ready(Err(err)));
      }
    };

    let (seq, lane, mut turn) = {
      let mut st = self.state.lock();
      st.generation += 1;
      let seq = st.generation;
      let (lane, turn) = st.saves.join(row.record_id.clone(), seq, || row.content.clone());
      (seq, lane, turn)
    };
    self.set_content(record_id, |_| Some(content.to_owned()));

    let this = Arc::clone(self);
    Box::pin(async move {
      turn.ready().await;
      let record_id = update.record_id.clone();
      let sent = update.content.clone();
      debug!(%record_id, resource = update.resource, field = %update.field, "saving record");

      let result = this.remote.update_record(update).await;
      if result.is_ok() {
        lane.record(sent);
      }

      let newest = {
        let mut st = this.state.lock();
        let newest = !st.saves.superseded(&record_id, seq);
        st.saves.leave(&record_id, &lane);
        newest
      };
      if newest {
        let saved = lane.settled();
        this.set_content(&record_id, |current| (current != saved).then(|| saved.clone()));
      }

      let Err(err) = result else {
        return Ok(());
      };
      let message = err.to_string();
      warn!(%record_id, error = %message, "record save failed");
      this.notices.push(Notice::WriteFailed { slot: None, message: message.clone() });
      Err(Error::RemoteWriteFailed { operation: "update record", message })
    })
  }

  /// Rewrite one row's content if `f` returns a new value for it.
  fn set_content(&self, record_id: &str, f: impl FnOnce(&str) -> Option<String>) {
    self.rows.send_if_modified(|rows| {
      let Some(i) = rows.iter().position(|r| r.record_id == record_id) else {
        return false;
      };
      let Some(content) = f(rows[i].content.as_str()) else {
        return false;
      };
      Arc::make_mut(rows)[i].content = content;
      true
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::{Call, CallKind, ScriptedRemote, date, drain, record};

  async fn loaded(remote: &Arc<ScriptedRemote>) -> Arc<DailyLog<ScriptedRemote>> {
    let log = DailyLog::new(Arc::clone(remote), date());
    let l = Arc::clone(&log);
    let fetch = tokio::spawn(async move { l.load(date()).await });
    drain().await;
    remote.release(CallKind::FetchRecords, true);
    fetch.await.unwrap().unwrap();
    log
  }

  fn content(log: &DailyLog<ScriptedRemote>, id: &str) -> String {
    log.rows().iter().find(|r| r.record_id == id).unwrap().content.clone()
  }

  #[tokio::test]
  async fn edit_is_routed_to_the_category_resource() {
    let remote = Arc::new(ScriptedRemote::auto("T"));
    remote.seed_records([record("m-1", "meals", "ate half")]);
    let log = loaded(&remote).await;

    log.edit_content("m-1", "ate all").await.unwrap();

    let calls = remote.calls_of(CallKind::UpdateRecord);
    let [Call::UpdateRecord(update)] = calls.as_slice() else {
      panic!("expected one update, got {calls:?}");
    };
    assert_eq!(update.resource, "meal-records");
    assert_eq!(update.body(), serde_json::json!({ "notes": "ate all" }));
    assert_eq!(content(&log, "m-1"), "ate all");
    assert_eq!(remote.server_records()[0].content, "ate all");
  }

  #[tokio::test]
  async fn failed_save_reverts_only_that_row() {
    let remote = Arc::new(ScriptedRemote::manual("T"));
    remote.seed_records([
      record("m-1", "meals", "ate half"),
      record("o-1", "observation", "calm"),
    ]);
    let log = loaded(&remote).await;
    let mut notices = log.notices();

    let meals = tokio::spawn(log.edit_content("m-1", "ate all"));
    let obs = tokio::spawn(log.edit_content("o-1", "calm, alert"));
    assert_eq!(content(&log, "m-1"), "ate all");
    drain().await;

    assert!(remote.release(CallKind::UpdateRecord, false));
    assert!(remote.release(CallKind::UpdateRecord, true));
    assert!(meals.await.unwrap().is_err());
    obs.await.unwrap().unwrap();

    assert_eq!(content(&log, "m-1"), "ate half");
    assert_eq!(content(&log, "o-1"), "calm, alert");
    assert!(matches!(notices.try_recv(), Ok(Notice::WriteFailed { slot: None, .. })));
  }

  #[tokio::test]
  async fn two_failed_saves_fall_back_to_the_saved_content() {
    let remote = Arc::new(ScriptedRemote::manual("T"));
    remote.seed_records([record("m-1", "meals", "ate half")]);
    let log = loaded(&remote).await;

    let first = tokio::spawn(log.edit_content("m-1", "ate all"));
    let second = tokio::spawn(log.edit_content("m-1", "ate nothing"));
    drain().await;
    assert_eq!(remote.waiting().len(), 1);

    assert!(remote.release(CallKind::UpdateRecord, false));
    drain().await;
    assert!(first.await.unwrap().is_err());
    assert_eq!(content(&log, "m-1"), "ate nothing");

    assert!(remote.release(CallKind::UpdateRecord, false));
    assert!(second.await.unwrap().is_err());
    assert_eq!(content(&log, "m-1"), "ate half");
    assert_eq!(remote.server_records()[0].content, "ate half");
  }

  #[tokio::test]
  async fn failed_save_after_an_accepted_one_shows_the_accepted_content() {
    let remote = Arc::new(ScriptedRemote::manual("T"));
    remote.seed_records([record("m-1", "meals", "ate half")]);
    let log = loaded(&remote).await;

    let first = tokio::spawn(log.edit_content("m-1", "ate all"));
    let second = tokio::spawn(log.edit_content("m-1", "ate nothing"));
    drain().await;
    assert!(remote.release(CallKind::UpdateRecord, true));
    drain().await;
    assert!(remote.release(CallKind::UpdateRecord, false));
    first.await.unwrap().unwrap();
    assert!(second.await.unwrap().is_err());

    assert_eq!(content(&log, "m-1"), "ate all");
    assert_eq!(remote.server_records()[0].content, "ate all");
  }

  #[tokio::test]
  async fn unknown_category_is_refused_without_a_request() {
    let remote = Arc::new(ScriptedRemote::auto("T"));
    remote.seed_records([record("x-1", "aromatherapy", "lavender")]);
    let log = loaded(&remote).await;
    let mut notices = log.notices();

    let err = log.edit_content("x-1", "rose").await.unwrap_err();

    assert!(matches!(err, Error::UnsupportedRecordType(_)));
    assert!(remote.calls_of(CallKind::UpdateRecord).is_empty());
    assert_eq!(content(&log, "x-1"), "lavender");
    assert_eq!(
      notices.try_recv().unwrap(),
      Notice::UnsupportedRecordType { label: "aromatherapy".into() }
    );
  }

  #[tokio::test]
  async fn load_overtaken_by_an_edit_is_discarded() {
    let remote = Arc::new(ScriptedRemote::manual("T"));
    remote.seed_records([record("m-1", "meals", "ate half")]);
    let log = loaded(&remote).await;

    let l = Arc::clone(&log);
    let reload = tokio::spawn(async move { l.load(date()).await });
    drain().await;
    let _edit = tokio::spawn(log.edit_content("m-1", "ate all"));
    assert!(remote.release(CallKind::FetchRecords, true));

    assert_eq!(reload.await.unwrap().unwrap(), FetchOutcome::Discarded);
    assert_eq!(content(&log, "m-1"), "ate all");
  }
}
