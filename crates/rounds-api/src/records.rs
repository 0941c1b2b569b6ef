//! Handlers for the per-category record resources and the daily feed.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/daily-records?date=YYYY-MM-DD` | Every category, by time recorded |
//! | `POST`  | `/records/{resource}` | Body: [`NewRecordBody`]; returns 201 |
//! | `PATCH` | `/records/{resource}/{id}` | Body: `{"<field>":"<content>"}` |
//!
//! `{resource}` is one of the category resources (`meal-records`,
//! `care-records`, ...). Each resource keeps its text in exactly one field,
//! either `description` or `notes`; naming the other one is a 400.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use rounds_core::{
  dispatch::{ContentField, RecordCategory, RecordUpdate},
  event::ResidentId,
  record::{DailyRecord, NewRecord},
  repository::CareRepository,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{error::ApiError, events::DateParams};

fn category(resource: &str) -> Result<RecordCategory, ApiError> {
  RecordCategory::from_resource(resource)
    .map_err(|_| ApiError::NotFound(format!("no record resource {resource:?}")))
}

// ─── Daily feed ──────────────────────────────────────────────────────────────

/// `GET /daily-records?date=<date>`
pub async fn daily<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DateParams>,
) -> Result<Json<Vec<DailyRecord>>, ApiError>
where
  S: CareRepository,
{
  let records = store.daily_records(params.date).await.map_err(ApiError::store)?;
  Ok(Json(records))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /records/{resource}`. The text goes in the
/// resource's own content field.
#[derive(Debug, Deserialize)]
pub struct NewRecordBody {
  pub resident_id: ResidentId,
  pub date:        NaiveDate,
  pub author:      String,
  pub description: Option<String>,
  pub notes:       Option<String>,
}

/// `POST /records/{resource}`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Path(resource): Path<String>,
  Json(body): Json<NewRecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CareRepository,
{
  let category = category(&resource)?;
  let field = category.route().field;
  let (content, other) = match field {
    ContentField::Description => (body.description, body.notes.map(|_| ContentField::Notes)),
    ContentField::Notes => (body.notes, body.description.map(|_| ContentField::Description)),
  };
  if let Some(other) = other {
    return Err(ApiError::BadRequest(format!("{resource} does not use field {other}")));
  }

  let input = NewRecord {
    resident_id: body.resident_id,
    date:        body.date,
    author:      body.author,
    content:     content.unwrap_or_default(),
  };
  let record = store.add_record(category, input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /records/{resource}/{id}`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path((resource, id)): Path<(String, String)>,
  Json(body): Json<Map<String, Value>>,
) -> Result<Json<DailyRecord>, ApiError>
where
  S: CareRepository,
{
  let category = category(&resource)?;
  let route = category.route();

  let mut fields = body.into_iter();
  let (name, value) = match (fields.next(), fields.next()) {
    (Some(only), None) => only,
    _ => return Err(ApiError::BadRequest("body must have exactly one field".into())),
  };
  let field = ContentField::from_name(&name)
    .ok_or_else(|| ApiError::BadRequest(format!("unknown field {name:?}")))?;
  if field != route.field {
    return Err(ApiError::BadRequest(format!("{resource} does not use field {field}")));
  }
  let Value::String(content) = value else {
    return Err(ApiError::BadRequest(format!("{field} must be a string")));
  };

  let update = RecordUpdate {
    category,
    resource: route.resource,
    field,
    record_id: id.clone(),
    content,
  };
  let record = store
    .update_record(update)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no record {id} in {resource}")))?;
  Ok(Json(record))
}
