//! Core types and the optimistic synchronisation engine for the rounds
//! care-record system.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! client side talks to the outside world through [`remote::CareRemote`]; the
//! server side persists through [`repository::CareRepository`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod coordinator;
pub mod daily;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod grid;
pub mod notice;
pub mod pending;
pub mod record;
pub mod remote;
pub mod repository;
pub mod resident;
pub mod resolver;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
