//! HTTP server for rounds.
//!
//! Mounts the JSON API from `rounds-api` under `/api`, behind HTTP Basic
//! auth, with request tracing.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::get};
use rounds_core::repository::CareRepository;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_auth};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROUNDS_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
}

// ─── Application state ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState<S> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthConfig>,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the server's [`Router`]. `/health` is open; everything under `/api`
/// requires credentials.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: CareRepository + 'static,
{
  let api = rounds_api::api_router(state.store)
    .layer(middleware::from_fn_with_state(state.auth, require_auth));

  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
  use rand_core::OsRng;
  use rounds_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  async fn make_state(password: &str) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AppState {
      store: Arc::new(store),
      auth:  Arc::new(AuthConfig { username: "nurse".to_string(), password_hash: hash }),
    }
  }

  fn get_req(uri: &str, auth: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some((user, pass)) = auth {
      builder =
        builder.header(header::AUTHORIZATION, format!("Basic {}", B64.encode(format!("{user}:{pass}"))));
    }
    builder.body(Body::empty()).unwrap()
  }

  #[tokio::test]
  async fn health_is_open() {
    let app = router(make_state("secret").await);
    let resp = app.oneshot(get_req("/health", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn api_requires_credentials() {
    let app = router(make_state("secret").await);
    let resp = app.oneshot(get_req("/api/residents", None)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
  }

  #[tokio::test]
  async fn api_rejects_wrong_password() {
    let app = router(make_state("secret").await);
    let resp = app
      .oneshot(get_req("/api/residents", Some(("nurse", "nope"))))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn api_serves_authenticated_requests() {
    let app = router(make_state("secret").await);
    let resp = app
      .oneshot(get_req("/api/events?date=2024-04-01", Some(("nurse", "secret"))))
      .await
      .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
  }
}
