//! Read-side aggregations over the citizens of one import.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike as _, NaiveDate};
use serde::{Serialize, Serializer, ser::SerializeMap as _};

use crate::citizen::{Citizen, CitizenId};

// ─── Birthday presents ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PresentCount {
  pub citizen_id: CitizenId,
  pub presents:   u32,
}

/// For every calendar month, how many presents each citizen buys for
/// relatives born in that month. Serialises as an object keyed `"1"`..`"12"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BirthdayPresents {
  months: [Vec<PresentCount>; 12],
}

impl BirthdayPresents {
  /// Entries for `month` (1-based), ordered by `citizen_id`.
  pub fn month(&self, month: u32) -> &[PresentCount] {
    match month {
      1..=12 => &self.months[month as usize - 1],
      _ => &[],
    }
  }
}

impl Serialize for BirthdayPresents {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.months.len()))?;
    for (index, entries) in self.months.iter().enumerate() {
      map.serialize_entry(&(index + 1).to_string(), entries)?;
    }
    map.end()
  }
}

pub fn birthday_presents(citizens: &[Citizen]) -> BirthdayPresents {
  let birth_month: HashMap<CitizenId, u32> = citizens
    .iter()
    .map(|c| (c.citizen_id, c.birth_date.month()))
    .collect();

  let mut presents = BirthdayPresents::default();
  for citizen in citizens {
    let mut per_month = [0u32; 12];
    for relative_id in &citizen.relatives {
      if let Some(&month) = birth_month.get(relative_id) {
        per_month[month as usize - 1] += 1;
      }
    }
    for (index, &count) in per_month.iter().enumerate() {
      if count > 0 {
        presents.months[index].push(PresentCount {
          citizen_id: citizen.citizen_id,
          presents:   count,
        });
      }
    }
  }

  for entries in &mut presents.months {
    entries.sort_by_key(|p| p.citizen_id);
  }
  presents
}

// ─── Age percentiles ─────────────────────────────────────────────────────────

/// Age percentiles of one town, rounded to [`PERCENTILE_DECIMALS`] places.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TownAgeStats {
  pub town: String,
  pub p50:  f64,
  pub p75:  f64,
  pub p99:  f64,
}

pub const PERCENTILE_DECIMALS: i32 = 2;

/// Age in full years on `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> u32 {
  let mut age = today.year() - birth_date.year();
  if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
    age -= 1;
  }
  age.max(0) as u32
}

/// Percentile `p` (0..=100) of ascending `sorted` using linear interpolation
/// between the closest ranks.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
  let Some(&first) = sorted.first() else {
    return 0.0;
  };
  if sorted.len() == 1 {
    return first;
  }

  let rank = p / 100.0 * (sorted.len() - 1) as f64;
  let lo = rank.floor() as usize;
  let hi = rank.ceil() as usize;
  sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

fn round_to(value: f64, decimals: i32) -> f64 {
  let scale = 10f64.powi(decimals);
  (value * scale).round() / scale
}

/// Per-town p50/p75/p99 of citizen ages, ordered by town name.
pub fn age_percentiles(
  citizens: &[Citizen],
  today: NaiveDate,
) -> Vec<TownAgeStats> {
  let mut by_town: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
  for citizen in citizens {
    by_town
      .entry(citizen.town.as_str())
      .or_default()
      .push(f64::from(age_on(citizen.birth_date, today)));
  }

  by_town
    .into_iter()
    .map(|(town, mut ages)| {
      ages.sort_by(f64::total_cmp);
      let at = |p| round_to(percentile(&ages, p), PERCENTILE_DECIMALS);
      TownAgeStats {
        town: town.to_owned(),
        p50:  at(50.0),
        p75:  at(75.0),
        p99:  at(99.0),
      }
    })
    .collect()
}
