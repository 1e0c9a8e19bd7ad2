//! Core types and trait definitions for the census registry.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the relation validator, the transactional import/patch coordinator written
//! against an abstract transaction, and the read-side aggregations.

pub mod aggregate;
pub mod citizen;
pub mod coordinator;
pub mod error;
pub mod relation;
pub mod store;

pub use error::{Error, ErrorKind, Result};
