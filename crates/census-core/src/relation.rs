//! Relation validation for imports and relation diffing for patches.
//!
//! The `relatives` relation is symmetric and irreflexive. An import must
//! declare every edge from both ends; nothing is inferred. A patch replaces one
//! citizen's relation set and the store re-symmetrises the partners according
//! to a [`RelationPlan`].

use std::collections::{BTreeMap, BTreeSet};

use crate::{
  Error, Result,
  citizen::{CitizenDraft, CitizenId},
};

// ─── Import batches ──────────────────────────────────────────────────────────

/// A batch that passed [`validate`]: citizen ids are unique and the relation
/// is symmetric, irreflexive and closed over the batch.
///
/// Only [`validate`] constructs this type, so a store that accepts a
/// `NormalizedBatch` never sees an unchecked relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBatch {
  citizens: BTreeMap<CitizenId, CitizenDraft>,
}

impl NormalizedBatch {
  pub fn len(&self) -> usize { self.citizens.len() }

  pub fn is_empty(&self) -> bool { self.citizens.is_empty() }

  /// Citizens in ascending `citizen_id` order.
  pub fn citizens(&self) -> impl Iterator<Item = &CitizenDraft> {
    self.citizens.values()
  }

  /// Every directed edge `(citizen, relative)`; each relation yields two.
  pub fn edges(&self) -> impl Iterator<Item = (CitizenId, CitizenId)> + '_ {
    self.citizens.values().flat_map(|draft| {
      draft
        .relatives
        .iter()
        .map(move |&relative_id| (draft.citizen_id, relative_id))
    })
  }
}

/// Check the relation of an incoming batch. Any violation rejects the whole
/// batch. Citizens are checked in ascending id order, relatives in the order
/// the caller listed them.
pub fn validate(drafts: Vec<CitizenDraft>) -> Result<NormalizedBatch> {
  if drafts.is_empty() {
    return Err(Error::EmptyImport);
  }

  let mut citizens = BTreeMap::new();
  for draft in drafts {
    let citizen_id = draft.citizen_id;
    if citizens.insert(citizen_id, draft).is_some() {
      return Err(Error::DuplicateCitizenId(citizen_id));
    }
  }

  for (&citizen_id, draft) in &citizens {
    let mut seen = BTreeSet::new();
    for &relative_id in &draft.relatives {
      if relative_id == citizen_id {
        return Err(Error::SelfRelation(citizen_id));
      }
      if !seen.insert(relative_id) {
        return Err(Error::DuplicateRelative { citizen_id, relative_id });
      }
      let Some(relative) = citizens.get(&relative_id) else {
        return Err(Error::UnknownRelative { citizen_id, relative_id });
      };
      if !relative.relatives.contains(&citizen_id) {
        return Err(Error::AsymmetricRelation { citizen_id, relative_id });
      }
    }
  }

  Ok(NormalizedBatch { citizens })
}

// ─── Patches ─────────────────────────────────────────────────────────────────

/// Turn a requested relatives list into a set, rejecting self-relations and
/// repeated ids. Existence of the relatives is checked against the store.
pub fn requested_set(
  citizen_id: CitizenId,
  requested: &[CitizenId],
) -> Result<BTreeSet<CitizenId>> {
  let mut set = BTreeSet::new();
  for &relative_id in requested {
    if relative_id == citizen_id {
      return Err(Error::SelfRelation(citizen_id));
    }
    if !set.insert(relative_id) {
      return Err(Error::DuplicateRelative { citizen_id, relative_id });
    }
  }
  Ok(set)
}

/// Partner-side edits needed to make a citizen's new relation set symmetric.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationPlan {
  /// Partners that must stop listing the citizen.
  pub to_remove: BTreeSet<CitizenId>,
  /// Partners that must start listing the citizen.
  pub to_add:    BTreeSet<CitizenId>,
}

impl RelationPlan {
  /// Diff against the connected set (partners currently listing the
  /// citizen), not the citizen's own stored list.
  pub fn diff(
    connected: &BTreeSet<CitizenId>,
    wanted: &BTreeSet<CitizenId>,
  ) -> Self {
    Self {
      to_remove: connected.difference(wanted).copied().collect(),
      to_add:    wanted.difference(connected).copied().collect(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.to_remove.is_empty() && self.to_add.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;
  use crate::citizen::Gender;

  fn draft(citizen_id: CitizenId, relatives: &[CitizenId]) -> CitizenDraft {
    CitizenDraft {
      citizen_id,
      town: "Москва".into(),
      street: "Льва Толстого".into(),
      building: "16к7стр5".into(),
      apartment: 7,
      name: format!("Citizen {citizen_id}"),
      birth_date: NaiveDate::from_ymd_opt(1986, 12, 26).unwrap(),
      gender: Gender::Female,
      relatives: relatives.to_vec(),
    }
  }

  fn set(ids: &[CitizenId]) -> BTreeSet<CitizenId> {
    ids.iter().copied().collect()
  }

  #[test]
  fn symmetric_pair_is_accepted() {
    let batch = validate(vec![draft(1, &[2]), draft(2, &[1])]).unwrap();
    assert_eq!(batch.len(), 2);
    let edges: Vec<_> = batch.edges().collect();
    assert_eq!(edges, vec![(1, 2), (2, 1)]);
  }

  #[test]
  fn isolated_citizens_are_accepted() {
    let batch = validate(vec![draft(5, &[]), draft(3, &[])]).unwrap();
    let ids: Vec<_> = batch.citizens().map(|c| c.citizen_id).collect();
    assert_eq!(ids, vec![3, 5]);
    assert_eq!(batch.edges().count(), 0);
  }

  #[test]
  fn empty_batch_is_rejected() {
    assert!(matches!(validate(vec![]), Err(Error::EmptyImport)));
  }

  #[test]
  fn duplicate_citizen_id_is_rejected() {
    let err = validate(vec![draft(1, &[]), draft(1, &[])]).unwrap_err();
    assert!(matches!(err, Error::DuplicateCitizenId(1)));
  }

  #[test]
  fn self_relation_is_rejected() {
    let err = validate(vec![draft(1, &[1])]).unwrap_err();
    assert!(matches!(err, Error::SelfRelation(1)));
  }

  #[test]
  fn dangling_relative_is_rejected() {
    let err = validate(vec![draft(1, &[2])]).unwrap_err();
    assert!(matches!(
      err,
      Error::UnknownRelative { citizen_id: 1, relative_id: 2 }
    ));
  }

  #[test]
  fn one_sided_relation_is_rejected() {
    let err = validate(vec![draft(1, &[2]), draft(2, &[])]).unwrap_err();
    assert!(matches!(
      err,
      Error::AsymmetricRelation { citizen_id: 1, relative_id: 2 }
    ));
  }

  #[test]
  fn repeated_relative_is_rejected() {
    let err = validate(vec![draft(1, &[2, 2]), draft(2, &[1])]).unwrap_err();
    assert!(matches!(
      err,
      Error::DuplicateRelative { citizen_id: 1, relative_id: 2 }
    ));
  }

  #[test]
  fn one_bad_record_rejects_the_whole_batch() {
    let err = validate(vec![
      draft(1, &[2, 3]),
      draft(2, &[1]),
      draft(3, &[1]),
      draft(4, &[4]),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::SelfRelation(4)));
  }

  #[test]
  fn requested_set_rejects_self_and_repeats() {
    assert_eq!(requested_set(1, &[3, 2]).unwrap(), set(&[2, 3]));
    assert!(matches!(requested_set(1, &[1]), Err(Error::SelfRelation(1))));
    assert!(matches!(
      requested_set(1, &[2, 2]),
      Err(Error::DuplicateRelative { .. })
    ));
  }

  #[test]
  fn plan_diffs_against_connected_set() {
    let plan = RelationPlan::diff(&set(&[2, 3]), &set(&[3, 4]));
    assert_eq!(plan.to_remove, set(&[2]));
    assert_eq!(plan.to_add, set(&[4]));

    assert!(RelationPlan::diff(&set(&[2]), &set(&[2])).is_empty());
  }
}
