//! Error type for `census-store-sqlite`.

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] census_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  /// A column held a value the domain types cannot represent.
  #[error("corrupt column `{column}`: {value}")]
  Corrupt {
    column: &'static str,
    value:  String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Lock contention surfaces as `SQLITE_BUSY` / `SQLITE_LOCKED`.
fn is_contention(err: &rusqlite::Error) -> bool {
  matches!(
    err.sqlite_error_code(),
    Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
  )
}

impl From<Error> for census_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(e) => e,
      Error::Sqlite(e) if is_contention(&e) => Self::Conflict(e.to_string()),
      Error::Database(tokio_rusqlite::Error::Rusqlite(e))
        if is_contention(&e) =>
      {
        Self::Conflict(e.to_string())
      }
      other => Self::Store(Box::new(other)),
    }
  }
}

/// Map a raw SQLite failure inside a transaction to a core error.
pub(crate) fn db(err: rusqlite::Error) -> census_core::Error {
  Error::Sqlite(err).into()
}
