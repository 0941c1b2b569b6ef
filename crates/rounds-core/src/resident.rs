//! Resident: a row of the round grid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::ResidentId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
  pub resident_id: ResidentId,
  pub name:        String,
  /// Room label, e.g. "201".
  pub room:        Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input to [`crate::repository::CareRepository::add_resident`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResident {
  pub name: String,
  #[serde(default)]
  pub room: Option<String>,
}
