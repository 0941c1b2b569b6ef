//! JSON REST API for rounds.
//!
//! Exposes an axum [`Router`] backed by any
//! [`rounds_core::repository::CareRepository`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rounds_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod events;
pub mod records;
pub mod residents;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post},
};
use rounds_core::repository::CareRepository;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CareRepository + 'static,
{
  Router::new()
    // Residents
    .route("/residents", get(residents::list::<S>).post(residents::create::<S>))
    // Grid events
    .route("/events", get(events::list::<S>).post(events::create::<S>))
    .route("/events/{id}", patch(events::update::<S>).delete(events::delete::<S>))
    // Daily records
    .route("/daily-records", get(records::daily::<S>))
    .route("/records/{resource}", post(records::create::<S>))
    .route("/records/{resource}/{id}", patch(records::update::<S>))
    .with_state(store)
}
