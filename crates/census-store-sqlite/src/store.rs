//! [`SqliteStore`] — the SQLite implementation of [`CitizenStore`].

use std::{path::Path, sync::Arc, time::Duration};

use census_core::{
  citizen::{Citizen, CitizenDraft, CitizenId, CitizenPatch, ImportId},
  coordinator::{self, ImportTx as _},
  relation,
  store::CitizenStore,
};
use chrono::Utc;
use rusqlite::{Connection, TransactionBehavior};
use tracing::{info, warn};

use crate::{Error, Result, error::db, schema::SCHEMA, tx::SqliteTx};

/// Total attempts for a write that keeps hitting lock contention.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// How long SQLite waits on a locked database before reporting busy, unless
/// overridden with [`SqliteStore::set_busy_timeout`].
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// A citizen registry backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// How long each write attempt waits on another writer's lock before it
  /// counts as a conflict.
  pub async fn set_busy_timeout(&self, timeout: Duration) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(timeout)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `op` inside one `BEGIN IMMEDIATE` transaction, committing only on
  /// success. Lock contention is retried up to [`MAX_WRITE_ATTEMPTS`] times.
  async fn write<T, F>(&self, label: &'static str, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: Fn(&SqliteTx<'_>) -> census_core::Result<T> + Clone + Send + 'static,
  {
    let mut attempt = 1;
    loop {
      let op = op.clone();
      let outcome = self
        .conn
        .call(move |conn| {
          Ok(in_transaction(conn, TransactionBehavior::Immediate, op))
        })
        .await?;

      match outcome {
        Err(census_core::Error::Conflict(reason))
          if attempt < MAX_WRITE_ATTEMPTS =>
        {
          warn!(op = label, attempt, %reason, "write conflict; retrying");
          attempt += 1;
        }
        other => return Ok(other?),
      }
    }
  }

  /// Run `op` inside a deferred (read) transaction for a consistent snapshot.
  async fn read<T, F>(&self, op: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&SqliteTx<'_>) -> census_core::Result<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        Ok(in_transaction(conn, TransactionBehavior::Deferred, op))
      })
      .await?;
    Ok(outcome?)
  }
}

/// Open a transaction, run `op`, and commit only if it succeeded. On error the
/// transaction is dropped, which rolls it back.
fn in_transaction<T>(
  conn: &mut Connection,
  behavior: TransactionBehavior,
  op: impl FnOnce(&SqliteTx<'_>) -> census_core::Result<T>,
) -> census_core::Result<T> {
  let tx = conn.transaction_with_behavior(behavior).map_err(db)?;
  let value = op(&SqliteTx::new(&tx))?;
  tx.commit().map_err(db)?;
  Ok(value)
}

// ─── CitizenStore impl ───────────────────────────────────────────────────────

impl CitizenStore for SqliteStore {
  type Error = Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn submit_import(&self, drafts: Vec<CitizenDraft>) -> Result<ImportId> {
    let today = Utc::now().date_naive();
    for draft in &drafts {
      draft.check(today)?;
    }
    let batch = Arc::new(relation::validate(drafts)?);
    let citizens = batch.len();

    let import_id = self
      .write("submit_import", move |tx| {
        coordinator::submit_import(tx, &batch)
      })
      .await?;

    info!(import_id, citizens, "import committed");
    Ok(import_id)
  }

  async fn patch_citizen(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
    patch: CitizenPatch,
  ) -> Result<Citizen> {
    let today = Utc::now().date_naive();
    let patch = Arc::new(patch);

    let citizen = self
      .write("patch_citizen", move |tx| {
        coordinator::patch_citizen(tx, import_id, citizen_id, &patch, today)
      })
      .await?;

    info!(import_id, citizen_id, "patch committed");
    Ok(citizen)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_citizen(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
  ) -> Result<Option<Citizen>> {
    self.read(move |tx| tx.get_citizen(import_id, citizen_id)).await
  }

  async fn list_citizens(&self, import_id: ImportId) -> Result<Vec<Citizen>> {
    let citizens = self.read(move |tx| tx.list_citizens(import_id)).await?;
    if citizens.is_empty() {
      return Err(census_core::Error::ImportNotFound(import_id).into());
    }
    Ok(citizens)
  }
}
