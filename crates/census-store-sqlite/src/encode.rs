//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and birth dates as ISO 8601
//! calendar dates. UUIDs are stored as hyphenated lowercase strings. Integer
//! ids are stored as SQLite integers.

use std::{collections::BTreeSet, str::FromStr as _};

use census_core::citizen::{Citizen, CitizenId, Gender, ImportId};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(date: NaiveDate) -> String {
  date.format("%Y-%m-%d").to_string()
}

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Gender ──────────────────────────────────────────────────────────────────

pub fn encode_gender(g: Gender) -> String { g.to_string() }

pub fn decode_gender(s: &str) -> Result<Gender> {
  Gender::from_str(s).map_err(|_| Error::Corrupt {
    column: "gender",
    value:  s.to_owned(),
  })
}

// ─── Integers ────────────────────────────────────────────────────────────────

/// Narrow a stored integer back to the unsigned domain type.
pub fn decode_u32(column: &'static str, raw: i64) -> Result<u32> {
  u32::try_from(raw).map_err(|_| Error::Corrupt {
    column,
    value: raw.to_string(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `citizens` row.
pub struct RawCitizen {
  pub id:         String,
  pub import_id:  i64,
  pub citizen_id: i64,
  pub town:       String,
  pub street:     String,
  pub building:   String,
  pub apartment:  i64,
  pub name:       String,
  pub birth_date: String,
  pub gender:     String,
}

impl RawCitizen {
  /// Column list matching [`RawCitizen::from_row`].
  pub const COLUMNS: &'static str = "id, import_id, citizen_id, town, street, \
                                     building, apartment, name, birth_date, \
                                     gender";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      import_id:  row.get(1)?,
      citizen_id: row.get(2)?,
      town:       row.get(3)?,
      street:     row.get(4)?,
      building:   row.get(5)?,
      apartment:  row.get(6)?,
      name:       row.get(7)?,
      birth_date: row.get(8)?,
      gender:     row.get(9)?,
    })
  }

  pub fn into_citizen(self, relatives: BTreeSet<CitizenId>) -> Result<Citizen> {
    let import_id: ImportId = decode_u32("import_id", self.import_id)?;
    Ok(Citizen {
      id: decode_uuid(&self.id)?,
      import_id,
      citizen_id: decode_u32("citizen_id", self.citizen_id)?,
      town: self.town,
      street: self.street,
      building: self.building,
      apartment: decode_u32("apartment", self.apartment)?,
      name: self.name,
      birth_date: decode_date(&self.birth_date)?,
      gender: decode_gender(&self.gender)?,
      relatives,
    })
  }
}
