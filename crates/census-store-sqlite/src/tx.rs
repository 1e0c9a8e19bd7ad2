//! [`SqliteTx`] — the SQLite implementation of [`ImportTx`].
//!
//! Wraps a connection that already has a transaction open; the store decides
//! whether it is committed.

use std::collections::{BTreeSet, HashMap};

use census_core::{
  Result,
  citizen::{Citizen, CitizenId, ImportId},
  coordinator::ImportTx,
  relation::NormalizedBatch,
};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _, params};
use uuid::Uuid;

use crate::{
  encode::{
    RawCitizen, decode_u32, encode_date, encode_dt, encode_gender, encode_uuid,
  },
  error::db,
};

pub struct SqliteTx<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteTx<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  fn relatives_of(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
  ) -> Result<BTreeSet<CitizenId>> {
    let mut stmt = self
      .conn
      .prepare_cached(
        "SELECT relative_id FROM relatives
         WHERE import_id = ?1 AND citizen_id = ?2",
      )
      .map_err(db)?;
    let ids = stmt
      .query_map(params![import_id, citizen_id], |row| row.get(0))
      .map_err(db)?
      .collect::<rusqlite::Result<BTreeSet<CitizenId>>>()
      .map_err(db)?;
    Ok(ids)
  }
}

impl ImportTx for SqliteTx<'_> {
  fn max_import_id(&self) -> Result<ImportId> {
    let max: i64 = self
      .conn
      .query_row("SELECT COALESCE(MAX(import_id), 0) FROM imports", [], |r| {
        r.get(0)
      })
      .map_err(db)?;
    Ok(decode_u32("import_id", max)?)
  }

  fn import_exists(&self, import_id: ImportId) -> Result<bool> {
    let exists = self
      .conn
      .query_row(
        "SELECT 1 FROM imports WHERE import_id = ?1",
        params![import_id],
        |_| Ok(true),
      )
      .optional()
      .map_err(db)?
      .unwrap_or(false);
    Ok(exists)
  }

  fn insert_batch(
    &self,
    import_id: ImportId,
    batch: &NormalizedBatch,
  ) -> Result<()> {
    self
      .conn
      .execute(
        "INSERT INTO imports (import_id, created_at) VALUES (?1, ?2)",
        params![import_id, encode_dt(Utc::now())],
      )
      .map_err(db)?;

    let mut insert_citizen = self
      .conn
      .prepare_cached(
        "INSERT INTO citizens (
           id, import_id, citizen_id, town, street, building,
           apartment, name, birth_date, gender
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      )
      .map_err(db)?;
    for draft in batch.citizens() {
      insert_citizen
        .execute(params![
          encode_uuid(Uuid::new_v4()),
          import_id,
          draft.citizen_id,
          draft.town,
          draft.street,
          draft.building,
          draft.apartment,
          draft.name,
          encode_date(draft.birth_date),
          encode_gender(draft.gender),
        ])
        .map_err(db)?;
    }

    let mut insert_edge = self
      .conn
      .prepare_cached(
        "INSERT INTO relatives (import_id, citizen_id, relative_id)
         VALUES (?1, ?2, ?3)",
      )
      .map_err(db)?;
    for (citizen_id, relative_id) in batch.edges() {
      insert_edge
        .execute(params![import_id, citizen_id, relative_id])
        .map_err(db)?;
    }
    Ok(())
  }

  fn get_citizen(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
  ) -> Result<Option<Citizen>> {
    let raw = self
      .conn
      .query_row(
        &format!(
          "SELECT {} FROM citizens WHERE import_id = ?1 AND citizen_id = ?2",
          RawCitizen::COLUMNS
        ),
        params![import_id, citizen_id],
        RawCitizen::from_row,
      )
      .optional()
      .map_err(db)?;

    let Some(raw) = raw else {
      return Ok(None);
    };
    let relatives = self.relatives_of(import_id, citizen_id)?;
    Ok(Some(raw.into_citizen(relatives)?))
  }

  fn list_citizens(&self, import_id: ImportId) -> Result<Vec<Citizen>> {
    let raws = self
      .conn
      .prepare_cached(&format!(
        "SELECT {} FROM citizens WHERE import_id = ?1 ORDER BY citizen_id",
        RawCitizen::COLUMNS
      ))
      .map_err(db)?
      .query_map(params![import_id], RawCitizen::from_row)
      .map_err(db)?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(db)?;

    let mut edges: HashMap<CitizenId, BTreeSet<CitizenId>> = HashMap::new();
    let mut stmt = self
      .conn
      .prepare_cached(
        "SELECT citizen_id, relative_id FROM relatives WHERE import_id = ?1",
      )
      .map_err(db)?;
    let rows = stmt
      .query_map(params![import_id], |row| {
        Ok((row.get::<_, CitizenId>(0)?, row.get::<_, CitizenId>(1)?))
      })
      .map_err(db)?;
    for row in rows {
      let (citizen_id, relative_id) = row.map_err(db)?;
      edges.entry(citizen_id).or_default().insert(relative_id);
    }

    raws
      .into_iter()
      .map(|raw| {
        let relatives = u32::try_from(raw.citizen_id)
          .ok()
          .and_then(|id| edges.remove(&id))
          .unwrap_or_default();
        Ok(raw.into_citizen(relatives)?)
      })
      .collect()
  }

  fn existing_citizen_ids(
    &self,
    import_id: ImportId,
    ids: &BTreeSet<CitizenId>,
  ) -> Result<BTreeSet<CitizenId>> {
    let mut stmt = self
      .conn
      .prepare_cached(
        "SELECT 1 FROM citizens WHERE import_id = ?1 AND citizen_id = ?2",
      )
      .map_err(db)?;

    let mut found = BTreeSet::new();
    for &citizen_id in ids {
      if stmt.exists(params![import_id, citizen_id]).map_err(db)? {
        found.insert(citizen_id);
      }
    }
    Ok(found)
  }

  fn connected_to(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
  ) -> Result<BTreeSet<CitizenId>> {
    let mut stmt = self
      .conn
      .prepare_cached(
        "SELECT citizen_id FROM relatives
         WHERE import_id = ?1 AND relative_id = ?2",
      )
      .map_err(db)?;
    let ids = stmt
      .query_map(params![import_id, citizen_id], |row| row.get(0))
      .map_err(db)?
      .collect::<rusqlite::Result<BTreeSet<CitizenId>>>()
      .map_err(db)?;
    Ok(ids)
  }

  fn add_relative(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
    relative_id: CitizenId,
  ) -> Result<()> {
    self
      .conn
      .prepare_cached(
        "INSERT OR IGNORE INTO relatives (import_id, citizen_id, relative_id)
         VALUES (?1, ?2, ?3)",
      )
      .map_err(db)?
      .execute(params![import_id, citizen_id, relative_id])
      .map_err(db)?;
    Ok(())
  }

  fn remove_relative(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
    relative_id: CitizenId,
  ) -> Result<()> {
    self
      .conn
      .prepare_cached(
        "DELETE FROM relatives
         WHERE import_id = ?1 AND citizen_id = ?2 AND relative_id = ?3",
      )
      .map_err(db)?
      .execute(params![import_id, citizen_id, relative_id])
      .map_err(db)?;
    Ok(())
  }

  fn set_relatives(
    &self,
    import_id: ImportId,
    citizen_id: CitizenId,
    relatives: &BTreeSet<CitizenId>,
  ) -> Result<()> {
    self
      .conn
      .execute(
        "DELETE FROM relatives WHERE import_id = ?1 AND citizen_id = ?2",
        params![import_id, citizen_id],
      )
      .map_err(db)?;
    for &relative_id in relatives {
      self.add_relative(import_id, citizen_id, relative_id)?;
    }
    Ok(())
  }

  fn update_fields(&self, citizen: &Citizen) -> Result<()> {
    self
      .conn
      .execute(
        "UPDATE citizens
         SET town = ?3, street = ?4, building = ?5, apartment = ?6,
             name = ?7, birth_date = ?8, gender = ?9
         WHERE import_id = ?1 AND citizen_id = ?2",
        params![
          citizen.import_id,
          citizen.citizen_id,
          citizen.town,
          citizen.street,
          citizen.building,
          citizen.apartment,
          citizen.name,
          encode_date(citizen.birth_date),
          encode_gender(citizen.gender),
        ],
      )
      .map_err(db)?;
    Ok(())
  }
}
