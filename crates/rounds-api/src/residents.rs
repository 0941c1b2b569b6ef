//! Handlers for `/residents` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/residents` | Ordered by room, then name |
//! | `POST` | `/residents` | Body: `{"name":"...","room":"201"}`; returns 201 |

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use rounds_core::{
  repository::CareRepository,
  resident::{NewResident, Resident},
};

use crate::error::ApiError;

/// `GET /residents`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<Resident>>, ApiError>
where
  S: CareRepository,
{
  let residents = store.list_residents().await.map_err(ApiError::store)?;
  Ok(Json(residents))
}

/// `POST /residents`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewResident>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CareRepository,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  let resident = store.add_resident(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(resident)))
}
