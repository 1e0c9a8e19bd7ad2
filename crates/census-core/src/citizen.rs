//! Citizen records — the rows of an import — and their wire-level inputs.
//!
//! [`CitizenDraft`] is one record of an incoming batch, [`CitizenPatch`] is a
//! partial update of a stored record, and [`Citizen`] is the persisted form
//! returned by every read.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Identifier of one batch import. Assigned by the store, starting at 1.
pub type ImportId = u32;

/// Caller-supplied identifier, unique only within its import.
pub type CitizenId = u32;

/// Upper bound on the length of any free-text field, in characters.
pub const MAX_TEXT_LEN: usize = 256;

// ─── Gender ──────────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
}

// ─── Citizen ─────────────────────────────────────────────────────────────────

/// A stored citizen. `id` and `import_id` are internal and never serialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Citizen {
  #[serde(skip)]
  pub id:         Uuid,
  #[serde(skip)]
  pub import_id:  ImportId,
  pub citizen_id: CitizenId,
  pub town:       String,
  pub street:     String,
  pub building:   String,
  pub apartment:  u32,
  pub name:       String,
  #[serde(with = "wire_date")]
  pub birth_date: NaiveDate,
  pub gender:     Gender,
  /// Serialised in ascending order.
  pub relatives:  BTreeSet<CitizenId>,
}

// ─── Draft ───────────────────────────────────────────────────────────────────

/// One record of an incoming import, before relation validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CitizenDraft {
  pub citizen_id: CitizenId,
  pub town:       String,
  pub street:     String,
  pub building:   String,
  pub apartment:  u32,
  pub name:       String,
  #[serde(with = "wire_date")]
  pub birth_date: NaiveDate,
  pub gender:     Gender,
  /// Raw list as sent by the caller; may still contain duplicates.
  pub relatives:  Vec<CitizenId>,
}

impl CitizenDraft {
  /// Field-level checks. Relation checks live in [`crate::relation`].
  pub fn check(&self, today: NaiveDate) -> Result<()> {
    check_place("town", &self.town)?;
    check_place("street", &self.street)?;
    check_place("building", &self.building)?;
    check_name(&self.name)?;
    check_birth_date(self.birth_date, today)
  }
}

// ─── Patch ───────────────────────────────────────────────────────────────────

/// A partial update of one citizen. Only the enumerated fields are patchable;
/// anything else in the body is rejected during deserialisation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CitizenPatch {
  pub town:       Option<String>,
  pub street:     Option<String>,
  pub building:   Option<String>,
  pub apartment:  Option<u32>,
  pub name:       Option<String>,
  #[serde(default, with = "wire_date::option")]
  pub birth_date: Option<NaiveDate>,
  pub gender:     Option<Gender>,
  pub relatives:  Option<Vec<CitizenId>>,
}

impl CitizenPatch {
  pub fn is_empty(&self) -> bool { *self == Self::default() }

  pub fn check(&self, today: NaiveDate) -> Result<()> {
    if self.is_empty() {
      return Err(Error::invalid("body", "patch must set at least one field"));
    }
    if let Some(town) = &self.town {
      check_place("town", town)?;
    }
    if let Some(street) = &self.street {
      check_place("street", street)?;
    }
    if let Some(building) = &self.building {
      check_place("building", building)?;
    }
    if let Some(name) = &self.name {
      check_name(name)?;
    }
    if let Some(birth_date) = self.birth_date {
      check_birth_date(birth_date, today)?;
    }
    Ok(())
  }

  /// Copy the scalar (non-relation) edits onto `citizen`.
  pub fn apply_fields(&self, citizen: &mut Citizen) {
    if let Some(town) = &self.town {
      citizen.town.clone_from(town);
    }
    if let Some(street) = &self.street {
      citizen.street.clone_from(street);
    }
    if let Some(building) = &self.building {
      citizen.building.clone_from(building);
    }
    if let Some(apartment) = self.apartment {
      citizen.apartment = apartment;
    }
    if let Some(name) = &self.name {
      citizen.name.clone_from(name);
    }
    if let Some(birth_date) = self.birth_date {
      citizen.birth_date = birth_date;
    }
    if let Some(gender) = self.gender {
      citizen.gender = gender;
    }
  }
}

// ─── Field rules ─────────────────────────────────────────────────────────────

fn check_text(field: &'static str, value: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(Error::invalid(field, "must not be empty"));
  }
  if value.chars().count() > MAX_TEXT_LEN {
    return Err(Error::invalid(
      field,
      format!("must be at most {MAX_TEXT_LEN} characters"),
    ));
  }
  Ok(())
}

/// Town, street and building must contain at least one letter or digit.
fn check_place(field: &'static str, value: &str) -> Result<()> {
  check_text(field, value)?;
  if !value.chars().any(char::is_alphanumeric) {
    return Err(Error::invalid(field, "must contain a letter or a digit"));
  }
  Ok(())
}

fn check_name(value: &str) -> Result<()> { check_text("name", value) }

fn check_birth_date(date: NaiveDate, today: NaiveDate) -> Result<()> {
  if date > today {
    return Err(Error::invalid("birth_date", "must not be in the future"));
  }
  Ok(())
}

// ─── Wire date format ────────────────────────────────────────────────────────

/// `DD.MM.YYYY` (de)serialisation for `birth_date`.
pub mod wire_date {
  use chrono::NaiveDate;
  use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

  pub const FORMAT: &str = "%d.%m.%Y";

  /// Parse a strictly zero-padded `DD.MM.YYYY` date.
  pub fn parse(raw: &str) -> Result<NaiveDate, String> {
    if raw.len() != 10 {
      return Err(format!("expected a DD.MM.YYYY date, got {raw:?}"));
    }
    NaiveDate::parse_from_str(raw, FORMAT)
      .map_err(|e| format!("invalid date {raw:?}: {e}"))
  }

  pub fn serialize<S: Serializer>(
    date: &NaiveDate,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(FORMAT))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(D::Error::custom)
  }

  pub mod option {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(
      date: &Option<NaiveDate>,
      serializer: S,
    ) -> Result<S::Ok, S::Error> {
      match date {
        Some(d) => super::serialize(d, serializer),
        None => serializer.serialize_none(),
      }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
      deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
      Option::<String>::deserialize(deserializer)?
        .map(|raw| super::parse(&raw).map_err(D::Error::custom))
        .transpose()
    }
  }
}
