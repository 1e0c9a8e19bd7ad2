//! Transactional import and patch logic.
//!
//! Both operations are written against [`ImportTx`], which stands for exactly
//! one open store transaction. The caller opens the transaction, runs one of
//! the functions here, and commits only on `Ok`; any `Err` is followed by a
//! rollback, so a failed call never leaves partial state behind.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::{
  Error, Result,
  citizen::{Citizen, CitizenId, CitizenPatch, ImportId},
  relation::{self, NormalizedBatch, RelationPlan},
};

// ─── Store primitives ────────────────────────────────────────────────────────

/// Store primitives available inside one open transaction.
///
/// Relation edges are directed: `add_relative(i, c, r)` makes `r` appear in
/// `c`'s relatives and nothing else. Keeping both directions in step is the
/// coordinator's job.
pub trait ImportTx {
  /// Highest committed import id, or 0 for an empty store.
  fn max_import_id(&self) -> Result<ImportId>;

  fn import_exists(&self, import_id: ImportId) -> Result<bool>;

  /// Record the import and insert every citizen and edge of `batch`. The
  /// store generates each row's internal `id`.
  fn insert_batch(
    &self,
    import_id: ImportId,
    batch: &NormalizedBatch,
  ) -> Result<()>;

  fn get_citizen(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
  ) -> Result<Option<Citizen>>;

  /// All citizens of an import in ascending `citizen_id` order.
  fn list_citizens(&self, import_id: ImportId) -> Result<Vec<Citizen>>;

  /// The subset of `ids` that exist in the import.
  fn existing_citizen_ids(
    &self,
    import_id: ImportId,
    ids: &BTreeSet<CitizenId>,
  ) -> Result<BTreeSet<CitizenId>>;

  /// Citizens whose relatives currently include `citizen_id`.
  fn connected_to(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
  ) -> Result<BTreeSet<CitizenId>>;

  fn add_relative(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
    relative_id: CitizenId,
  ) -> Result<()>;

  fn remove_relative(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
    relative_id: CitizenId,
  ) -> Result<()>;

  /// Replace `citizen_id`'s own relatives with exactly `relatives`.
  fn set_relatives(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
    relatives: &BTreeSet<CitizenId>,
  ) -> Result<()>;

  /// Persist the scalar fields of `citizen`; relatives are left untouched.
  fn update_fields(&self, citizen: &Citizen) -> Result<()>;
}

// ─── Import ──────────────────────────────────────────────────────────────────

/// Allocate the next import id and persist `batch` under it.
///
/// The id is derived from committed imports inside the same transaction, so a
/// rolled-back import never consumes one.
pub fn submit_import<T>(tx: &T, batch: &NormalizedBatch) -> Result<ImportId>
where
  T: ImportTx + ?Sized,
{
  let import_id = tx
    .max_import_id()?
    .checked_add(1)
    .ok_or_else(|| Error::Store("import id space exhausted".into()))?;

  tx.insert_batch(import_id, batch)?;
  debug!(import_id, citizens = batch.len(), "import staged");
  Ok(import_id)
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// Progress of a single patch call inside the caller's transaction. The
/// stages end at `FieldsApplied`: committing on `Ok`, or rolling back on
/// `Err` from any stage, is the store's job once [`patch_citizen`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchStage {
  Loaded,
  Validated,
  RelationsDiffed,
  RelationsApplied,
  FieldsApplied,
}

/// Apply `patch` to one citizen and re-symmetrise the partners affected by a
/// relation change. Returns the citizen as stored after the edit.
pub fn patch_citizen<T>(
  tx: &T,
  import_id: ImportId,
  citizen_id: CitizenId,
  patch: &CitizenPatch,
  today: NaiveDate,
) -> Result<Citizen>
where
  T: ImportTx + ?Sized,
{
  let mut reached = None;
  let result =
    run_patch(tx, import_id, citizen_id, patch, today, &mut reached);
  if let Err(e) = &result {
    debug!(import_id, citizen_id, stage = ?reached, error = %e, "patch aborted");
  }
  result
}

fn run_patch<T>(
  tx: &T,
  import_id: ImportId,
  citizen_id: CitizenId,
  patch: &CitizenPatch,
  today: NaiveDate,
  reached: &mut Option<PatchStage>,
) -> Result<Citizen>
where
  T: ImportTx + ?Sized,
{
  let mut advance = |stage: PatchStage| {
    debug!(import_id, citizen_id, ?stage, "patch stage");
    *reached = Some(stage);
  };

  let mut citizen = match tx.get_citizen(import_id, citizen_id)? {
    Some(citizen) => citizen,
    None if !tx.import_exists(import_id)? => {
      return Err(Error::ImportNotFound(import_id));
    }
    None => return Err(Error::CitizenNotFound { import_id, citizen_id }),
  };
  advance(PatchStage::Loaded);

  patch.check(today)?;
  let wanted = patch
    .relatives
    .as_deref()
    .map(|requested| relation::requested_set(citizen_id, requested))
    .transpose()?;
  if let Some(wanted) = &wanted {
    let existing = tx.existing_citizen_ids(import_id, wanted)?;
    if let Some(&relative_id) = wanted.difference(&existing).next() {
      return Err(Error::UnknownRelative { citizen_id, relative_id });
    }
  }
  advance(PatchStage::Validated);

  if let Some(wanted) = &wanted {
    let connected = tx.connected_to(import_id, citizen_id)?;
    let plan = RelationPlan::diff(&connected, wanted);
    advance(PatchStage::RelationsDiffed);

    for &partner in &plan.to_remove {
      tx.remove_relative(import_id, partner, citizen_id)?;
    }
    for &partner in &plan.to_add {
      tx.add_relative(import_id, partner, citizen_id)?;
    }
    tx.set_relatives(import_id, citizen_id, wanted)?;
    advance(PatchStage::RelationsApplied);
  }

  patch.apply_fields(&mut citizen);
  tx.update_fields(&citizen)?;
  advance(PatchStage::FieldsApplied);

  tx.get_citizen(import_id, citizen_id)?
    .ok_or(Error::CitizenNotFound { import_id, citizen_id })
}

#[cfg(test)]
mod tests {
  use std::{cell::RefCell, collections::BTreeMap};

  use uuid::Uuid;

  use super::*;
  use crate::citizen::{CitizenDraft, Gender};

  /// Map-backed transaction; every write lands immediately.
  #[derive(Default)]
  struct MemoryTx {
    citizens: RefCell<BTreeMap<(ImportId, CitizenId), Citizen>>,
  }

  impl MemoryTx {
    fn relatives(&self, c: CitizenId) -> Vec<CitizenId> {
      self.citizens.borrow()[&(1, c)].relatives.iter().copied().collect()
    }
  }

  impl ImportTx for MemoryTx {
    fn max_import_id(&self) -> Result<ImportId> {
      Ok(self.citizens.borrow().keys().map(|k| k.0).max().unwrap_or(0))
    }

    fn import_exists(&self, import_id: ImportId) -> Result<bool> {
      Ok(self.citizens.borrow().keys().any(|k| k.0 == import_id))
    }

    fn insert_batch(
      &self,
      import_id: ImportId,
      batch: &NormalizedBatch,
    ) -> Result<()> {
      let mut citizens = self.citizens.borrow_mut();
      for d in batch.citizens() {
        citizens.insert((import_id, d.citizen_id), Citizen {
          id:         Uuid::new_v4(),
          import_id,
          citizen_id: d.citizen_id,
          town:       d.town.clone(),
          street:     d.street.clone(),
          building:   d.building.clone(),
          apartment:  d.apartment,
          name:       d.name.clone(),
          birth_date: d.birth_date,
          gender:     d.gender,
          relatives:  d.relatives.iter().copied().collect(),
        });
      }
      Ok(())
    }

    fn get_citizen(
      &self,
      import_id: ImportId,
      citizen_id: CitizenId,
    ) -> Result<Option<Citizen>> {
      Ok(self.citizens.borrow().get(&(import_id, citizen_id)).cloned())
    }

    fn list_citizens(&self, import_id: ImportId) -> Result<Vec<Citizen>> {
      Ok(
        self
          .citizens
          .borrow()
          .values()
          .filter(|c| c.import_id == import_id)
          .cloned()
          .collect(),
      )
    }

    fn existing_citizen_ids(
      &self,
      import_id: ImportId,
      ids: &BTreeSet<CitizenId>,
    ) -> Result<BTreeSet<CitizenId>> {
      let citizens = self.citizens.borrow();
      Ok(
        ids
          .iter()
          .copied()
          .filter(|id| citizens.contains_key(&(import_id, *id)))
          .collect(),
      )
    }

    fn connected_to(
      &self,
      import_id: ImportId,
      citizen_id: CitizenId,
    ) -> Result<BTreeSet<CitizenId>> {
      Ok(
        self
          .citizens
          .borrow()
          .values()
          .filter(|c| c.import_id == import_id)
          .filter(|c| c.relatives.contains(&citizen_id))
          .map(|c| c.citizen_id)
          .collect(),
      )
    }

    fn add_relative(
      &self,
      import_id: ImportId,
      citizen_id: CitizenId,
      relative_id: CitizenId,
    ) -> Result<()> {
      if let Some(c) =
        self.citizens.borrow_mut().get_mut(&(import_id, citizen_id))
      {
        c.relatives.insert(relative_id);
      }
      Ok(())
    }

    fn remove_relative(
      &self,
      import_id: ImportId,
      citizen_id: CitizenId,
      relative_id: CitizenId,
    ) -> Result<()> {
      if let Some(c) =
        self.citizens.borrow_mut().get_mut(&(import_id, citizen_id))
      {
        c.relatives.remove(&relative_id);
      }
      Ok(())
    }

    fn set_relatives(
      &self,
      import_id: ImportId,
      citizen_id: CitizenId,
      relatives: &BTreeSet<CitizenId>,
    ) -> Result<()> {
      if let Some(c) =
        self.citizens.borrow_mut().get_mut(&(import_id, citizen_id))
      {
        c.relatives.clone_from(relatives);
      }
      Ok(())
    }

    fn update_fields(&self, citizen: &Citizen) -> Result<()> {
      let mut citizens = self.citizens.borrow_mut();
      if let Some(stored) =
        citizens.get_mut(&(citizen.import_id, citizen.citizen_id))
      {
        let relatives = std::mem::take(&mut stored.relatives);
        *stored = Citizen { relatives, ..citizen.clone() };
      }
      Ok(())
    }
  }

  fn today() -> NaiveDate { NaiveDate::from_ymd_opt(2019, 8, 20).unwrap() }

  fn draft(citizen_id: CitizenId, relatives: &[CitizenId]) -> CitizenDraft {
    CitizenDraft {
      citizen_id,
      town: "Керчь".into(),
      street: "Иосифа Бродского".into(),
      building: "2".into(),
      apartment: 11,
      name: format!("Citizen {citizen_id}"),
      birth_date: NaiveDate::from_ymd_opt(1990, 3, 4).unwrap(),
      gender: Gender::Male,
      relatives: relatives.to_vec(),
    }
  }

  fn seeded(drafts: Vec<CitizenDraft>) -> MemoryTx {
    let tx = MemoryTx::default();
    let batch = relation::validate(drafts).unwrap();
    assert_eq!(submit_import(&tx, &batch).unwrap(), 1);
    tx
  }

  fn relatives_patch(ids: &[CitizenId]) -> CitizenPatch {
    CitizenPatch { relatives: Some(ids.to_vec()), ..Default::default() }
  }

  #[test]
  fn import_ids_follow_committed_maximum() {
    let tx = seeded(vec![draft(1, &[])]);
    let batch = relation::validate(vec![draft(1, &[])]).unwrap();
    assert_eq!(submit_import(&tx, &batch).unwrap(), 2);
  }

  #[test]
  fn patch_moves_relation_between_partners() {
    let tx = seeded(vec![draft(1, &[2]), draft(2, &[1]), draft(3, &[])]);

    let updated =
      patch_citizen(&tx, 1, 1, &relatives_patch(&[3]), today()).unwrap();

    assert_eq!(updated.relatives.iter().copied().collect::<Vec<_>>(), [3]);
    assert!(tx.relatives(2).is_empty());
    assert_eq!(tx.relatives(3), [1]);
  }

  #[test]
  fn patch_repairs_one_sided_edges_from_connected_set() {
    let tx = seeded(vec![draft(1, &[]), draft(2, &[]), draft(3, &[])]);
    // 2 lists 1 but 1 does not list 2.
    tx.add_relative(1, 2, 1).unwrap();

    patch_citizen(&tx, 1, 1, &relatives_patch(&[3]), today()).unwrap();

    assert!(tx.relatives(2).is_empty());
    assert_eq!(tx.relatives(1), [3]);
    assert_eq!(tx.relatives(3), [1]);
  }

  #[test]
  fn patch_rejects_unknown_relative() {
    let tx = seeded(vec![draft(1, &[])]);
    let err =
      patch_citizen(&tx, 1, 1, &relatives_patch(&[9]), today()).unwrap_err();
    assert!(matches!(
      err,
      Error::UnknownRelative { citizen_id: 1, relative_id: 9 }
    ));
  }

  #[test]
  fn patch_distinguishes_missing_import_from_missing_citizen() {
    let tx = seeded(vec![draft(1, &[])]);
    let patch = CitizenPatch { apartment: Some(3), ..Default::default() };

    assert!(matches!(
      patch_citizen(&tx, 1, 2, &patch, today()),
      Err(Error::CitizenNotFound { import_id: 1, citizen_id: 2 })
    ));
    assert!(matches!(
      patch_citizen(&tx, 7, 1, &patch, today()),
      Err(Error::ImportNotFound(7))
    ));
  }

  #[test]
  fn field_only_patch_keeps_relatives() {
    let tx = seeded(vec![draft(1, &[2]), draft(2, &[1])]);
    let patch = CitizenPatch {
      street: Some("Ленина".into()),
      gender: Some(Gender::Female),
      ..Default::default()
    };

    let updated = patch_citizen(&tx, 1, 2, &patch, today()).unwrap();
    assert_eq!(updated.street, "Ленина");
    assert_eq!(updated.gender, Gender::Female);
    assert_eq!(tx.relatives(2), [1]);
  }
}
