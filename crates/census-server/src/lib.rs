//! HTTP server wiring for the census registry.
//!
//! Holds the runtime configuration and assembles the application router with
//! request tracing on top of [`census_api::api_router`].

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use census_core::store::CitizenStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CENSUS_*` environment variables. Every key is optional.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
  pub host:            String,
  pub port:            u16,
  pub store_path:      PathBuf,
  /// Per-attempt wait on a locked database before a write counts as a
  /// conflict.
  pub busy_timeout_ms: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:            "0.0.0.0".to_string(),
      port:            8080,
      store_path:      PathBuf::from("census.db"),
      busy_timeout_ms: 5_000,
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: API routes plus a per-request tracing span.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: CitizenStore + 'static,
{
  census_api::api_router(store).layer(TraceLayer::new_for_http())
}
