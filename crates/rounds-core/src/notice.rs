//! User-visible notices: the engine's equivalent of a toast.

use tokio::sync::broadcast;

use crate::event::Slot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
  /// A write was rejected and the local state rolled back.
  WriteFailed {
    slot:    Option<Slot>,
    message: String,
  },
  /// An edit was refused because its category has no backing resource.
  UnsupportedRecordType { label: String },
}

impl Notice {
  pub fn message(&self) -> String {
    match self {
      Self::WriteFailed { slot: Some(slot), message } => {
        format!("could not save {slot}: {message}")
      }
      Self::WriteFailed { slot: None, message } => format!("could not save: {message}"),
      Self::UnsupportedRecordType { label } => {
        format!("records of type {label:?} cannot be edited here")
      }
    }
  }
}

/// Fan-out of notices to any number of listeners. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notices {
  tx: broadcast::Sender<Notice>,
}

impl Notices {
  pub fn new() -> Self {
    let (tx, _) = broadcast::channel(64);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<Notice> { self.tx.subscribe() }

  /// Publish `notice`. Having no listeners is not an error.
  pub fn push(&self, notice: Notice) {
    let _ = self.tx.send(notice);
  }
}

impl Default for Notices {
  fn default() -> Self { Self::new() }
}
