//! The `CitizenStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `census-store-sqlite`).
//! The HTTP layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  aggregate::{self, BirthdayPresents, TownAgeStats},
  citizen::{Citizen, CitizenDraft, CitizenId, CitizenPatch, ImportId},
};

/// Abstraction over a citizen registry backend.
///
/// Every write is one atomic unit: it either commits completely or leaves the
/// store as it was. Backend errors convert into [`crate::Error`] so callers
/// can classify them with [`crate::Error::kind`].
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CitizenStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + Into<crate::Error> + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Validate a batch (fields and relations) and persist it under a freshly
  /// allocated import id. Nothing is written if validation fails.
  fn submit_import(
    &self,
    drafts: Vec<CitizenDraft>,
  ) -> impl Future<Output = Result<ImportId, Self::Error>> + Send + '_;

  /// Apply a partial update to one citizen, keeping the relation symmetric.
  /// Returns the citizen as stored after the update.
  fn patch_citizen(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
    patch: CitizenPatch,
  ) -> impl Future<Output = Result<Citizen, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve one citizen. Returns `None` if not found.
  fn get_citizen(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
  ) -> impl Future<Output = Result<Option<Citizen>, Self::Error>> + Send + '_;

  /// All citizens of an import, ordered by `citizen_id`. Fails with
  /// [`crate::Error::ImportNotFound`] if the import has no rows.
  fn list_citizens(
    &self,
    import_id: ImportId,
  ) -> impl Future<Output = Result<Vec<Citizen>, Self::Error>> + Send + '_;

  // ── Aggregations ──────────────────────────────────────────────────────

  fn birthday_presents(
    &self,
    import_id: ImportId,
  ) -> impl Future<Output = Result<BirthdayPresents, Self::Error>> + Send + '_ {
    async move {
      let citizens = self.list_citizens(import_id).await?;
      Ok(aggregate::birthday_presents(&citizens))
    }
  }

  /// Age percentiles per town, with ages computed as of `today`.
  fn age_percentiles(
    &self,
    import_id: ImportId,
    today: NaiveDate,
  ) -> impl Future<Output = Result<Vec<TownAgeStats>, Self::Error>> + Send + '_
  {
    async move {
      let citizens = self.list_citizens(import_id).await?;
      Ok(aggregate::age_percentiles(&citizens, today))
    }
  }
}
