//! Handlers for `/events` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/events?date=YYYY-MM-DD` | Every event on that date |
//! | `POST`   | `/events` | Body: [`NewEvent`]; returns 201 + stored event |
//! | `PATCH`  | `/events/{id}` | Body: `{"note":"..."}`; notes only |
//! | `DELETE` | `/events/{id}` | 204, or 404 if absent |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use rounds_core::{
  event::{Event, EventId, EventPatch, FacetKind, NewEvent},
  repository::CareRepository,
};
use serde::Deserialize;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct DateParams {
  pub date: NaiveDate,
}

/// `GET /events?date=<date>`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<DateParams>,
) -> Result<Json<Vec<Event>>, ApiError>
where
  S: CareRepository,
{
  let events = store.list_events(params.date).await.map_err(ApiError::store)?;
  Ok(Json(events))
}

/// `POST /events`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewEvent>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CareRepository,
{
  if body.actor.trim().is_empty() {
    return Err(ApiError::BadRequest("actor must not be empty".into()));
  }
  let event = store.create_event(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(event)))
}

/// `PATCH /events/{id}`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
  Json(patch): Json<EventPatch>,
) -> Result<Json<Event>, ApiError>
where
  S: CareRepository,
{
  let id = EventId::new(id);
  let existing = store
    .get_event(id.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;
  if existing.facet() != FacetKind::FreeTextNote {
    return Err(ApiError::BadRequest(format!("event {id} is not a note")));
  }

  let event = store
    .update_event(id.clone(), patch)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;
  Ok(Json(event))
}

/// `DELETE /events/{id}`
pub async fn delete<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: CareRepository,
{
  let id = EventId::new(id);
  if store.delete_event(id.clone()).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("event {id} not found")))
  }
}
