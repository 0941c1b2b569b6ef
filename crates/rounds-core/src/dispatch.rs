//! Record-type dispatch: category label → backing resource and content field.
//!
//! The daily view edits rows from eleven categories that live in different
//! resources, and the resources disagree on where free text goes (some use
//! `description`, others `notes`). A wrong pairing writes into an unrelated
//! column, so the table below is the single place that knows the mapping.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Content field ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentField {
  Description,
  Notes,
}

impl ContentField {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Description => "description",
      Self::Notes => "notes",
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "description" => Some(Self::Description),
      "notes" => Some(Self::Notes),
      _ => None,
    }
  }
}

impl fmt::Display for ContentField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Category ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
  Observation,
  Meals,
  Medication,
  Vitals,
  Excretion,
  /// Linen changes and room cleaning.
  Cleaning,
  Bathing,
  Weight,
  NursingNote,
  MedicalNote,
  Treatment,
}

/// Where an edit for a category must be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RecordRoute {
  pub resource: &'static str,
  pub field:    ContentField,
}

impl RecordCategory {
  pub const ALL: [RecordCategory; 11] = [
    Self::Observation,
    Self::Meals,
    Self::Medication,
    Self::Vitals,
    Self::Excretion,
    Self::Cleaning,
    Self::Bathing,
    Self::Weight,
    Self::NursingNote,
    Self::MedicalNote,
    Self::Treatment,
  ];

  /// The label used by the daily feed.
  pub fn label(self) -> &'static str {
    match self {
      Self::Observation => "observation",
      Self::Meals => "meals",
      Self::Medication => "medication",
      Self::Vitals => "vitals",
      Self::Excretion => "excretion",
      Self::Cleaning => "cleaning",
      Self::Bathing => "bathing",
      Self::Weight => "weight",
      Self::NursingNote => "nursing",
      Self::MedicalNote => "medical",
      Self::Treatment => "treatment",
    }
  }

  pub fn route(self) -> RecordRoute {
    use ContentField::{Description, Notes};

    let (resource, field) = match self {
      Self::Observation => ("care-records", Description),
      Self::Meals => ("meal-records", Notes),
      Self::Medication => ("medication-records", Notes),
      Self::Vitals => ("vital-records", Notes),
      Self::Excretion => ("excretion-records", Notes),
      Self::Cleaning => ("cleaning-records", Notes),
      Self::Bathing => ("bathing-records", Notes),
      Self::Weight => ("weight-records", Notes),
      Self::NursingNote => ("nursing-records", Description),
      Self::MedicalNote => ("medical-records", Description),
      Self::Treatment => ("treatment-records", Description),
    };
    RecordRoute { resource, field }
  }

  /// Parse a feed label. Matching ignores case and surrounding whitespace.
  pub fn from_label(label: &str) -> Result<Self> {
    let wanted = label.trim();
    Self::ALL
      .into_iter()
      .find(|c| c.label().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| Error::UnsupportedRecordType(label.to_owned()))
  }

  /// Reverse lookup from a resource path segment.
  pub fn from_resource(resource: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|c| c.route().resource == resource)
      .ok_or_else(|| Error::UnsupportedRecordType(resource.to_owned()))
  }
}

impl FromStr for RecordCategory {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::from_label(s) }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// A fully-routed content update, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordUpdate {
  pub category:  RecordCategory,
  pub resource:  &'static str,
  pub field:     ContentField,
  pub record_id: String,
  pub content:   String,
}

impl RecordUpdate {
  /// Request body: `{"<field>": "<content>"}`.
  pub fn body(&self) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert(
      self.field.as_str().to_owned(),
      serde_json::Value::String(self.content.clone()),
    );
    serde_json::Value::Object(body)
  }
}

/// Resolve the update request for a row of category `label`.
///
/// Fails with [`Error::UnsupportedRecordType`] when the label has no mapping;
/// nothing should be sent in that case.
pub fn dispatch(label: &str, record_id: &str, content: &str) -> Result<RecordUpdate> {
  let category = RecordCategory::from_label(label)?;
  let RecordRoute { resource, field } = category.route();
  Ok(RecordUpdate {
    category,
    resource,
    field,
    record_id: record_id.to_owned(),
    content: content.to_owned(),
  })
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;

  #[test]
  fn every_category_routes_to_its_own_resource() {
    let resources: HashSet<_> =
      RecordCategory::ALL.iter().map(|c| c.route().resource).collect();
    assert_eq!(resources.len(), RecordCategory::ALL.len());
  }

  #[test]
  fn field_conventions() {
    let description: Vec<_> = RecordCategory::ALL
      .into_iter()
      .filter(|c| c.route().field == ContentField::Description)
      .map(RecordCategory::label)
      .collect();
    assert_eq!(description, ["observation", "nursing", "medical", "treatment"]);
  }

  #[test]
  fn labels_round_trip_and_resources_reverse() {
    for c in RecordCategory::ALL {
      assert_eq!(RecordCategory::from_label(c.label()).unwrap(), c);
      assert_eq!(RecordCategory::from_resource(c.route().resource).unwrap(), c);
    }
  }

  #[test]
  fn label_matching_is_lenient_about_case() {
    assert_eq!(
      RecordCategory::from_label("  Meals ").unwrap(),
      RecordCategory::Meals
    );
  }

  #[test]
  fn meals_update_targets_notes() {
    let update = dispatch("meals", "r-1", "ate well").unwrap();
    assert_eq!(update.resource, "meal-records");
    assert_eq!(update.field, ContentField::Notes);
    assert_eq!(update.body(), serde_json::json!({ "notes": "ate well" }));
  }

  #[test]
  fn unknown_label_is_rejected() {
    let err = dispatch("unknown-type", "r-1", "x").unwrap_err();
    assert!(matches!(err, Error::UnsupportedRecordType(ref l) if l == "unknown-type"));
    assert!(err.is_user_visible());
  }
}
