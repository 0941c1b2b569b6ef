//! Daily records: rows of the cross-category daily view.
//!
//! Every clinical category lives in its own backing resource. The daily feed
//! flattens them into one list; the category label on each row is what the
//! dispatcher uses to route an edit back to the right resource.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::event::ResidentId;

/// One row of the daily view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
  pub record_id:   String,
  /// Category label as delivered by the feed (e.g. `"meals"`). Kept as a
  /// string so rows from unknown categories can still be displayed.
  pub category:    String,
  pub resident_id: ResidentId,
  pub date:        NaiveDate,
  pub recorded_at: DateTime<Utc>,
  pub author:      String,
  /// The category's content field (`description` or `notes`).
  pub content:     String,
}

/// Input to [`crate::repository::CareRepository::add_record`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
  pub resident_id: ResidentId,
  pub date:        NaiveDate,
  pub author:      String,
  pub content:     String,
}
