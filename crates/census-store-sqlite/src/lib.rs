//! SQLite backend for the census registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every write runs the
//! [`census_core::coordinator`] inside one SQLite transaction.

mod encode;
mod schema;
mod store;
mod tx;

pub mod error;

pub use error::{Error, Result};
pub use store::{DEFAULT_BUSY_TIMEOUT, MAX_WRITE_ATTEMPTS, SqliteStore};
