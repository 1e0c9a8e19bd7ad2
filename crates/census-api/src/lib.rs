//! JSON REST API for the census registry.
//!
//! Exposes an axum [`Router`] backed by any [`census_core::store::CitizenStore`].
//! Transport concerns (binding, tracing layers) are the caller's
//! responsibility.
//!
//! Successful responses wrap their payload as `{"data": ...}`; failures are
//! `{"error": "...", "reason": "<tag>"}`.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = census_api::api_router(Arc::new(store));
//! ```

pub mod citizens;
pub mod error;
pub mod imports;
pub mod stats;

use std::sync::Arc;

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, patch, post},
};
use census_core::store::CitizenStore;
use serde::Serialize;

pub use error::ApiError;

/// Largest accepted request body. Sized for imports of tens of thousands of
/// citizens; axum's 2 MiB default rejects a 10 000-citizen batch.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Success envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Data<T> {
  pub data: T,
}

impl<T> Data<T> {
  pub fn new(data: T) -> Self { Self { data } }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: CitizenStore + 'static,
{
  Router::new()
    // Imports
    .route("/imports", post(imports::create::<S>))
    // Citizens
    .route("/imports/{import_id}/citizens", get(citizens::list::<S>))
    .route(
      "/imports/{import_id}/citizens/{citizen_id}",
      patch(citizens::patch_one::<S>),
    )
    // Aggregations
    .route(
      "/imports/{import_id}/citizens/birthdays",
      get(stats::birthdays::<S>),
    )
    .route(
      "/imports/{import_id}/towns/stat/percentile/age",
      get(stats::age_percentiles::<S>),
    )
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .with_state(store)
}
