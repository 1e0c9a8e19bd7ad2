//! Error types for `census-core`.

use thiserror::Error;

use crate::citizen::{CitizenId, ImportId};

#[derive(Debug, Error)]
pub enum Error {
  // ── Field validation ──────────────────────────────────────────────────
  #[error("invalid field `{field}`: {reason}")]
  InvalidField {
    field:  &'static str,
    reason: String,
  },

  // ── Relation integrity ────────────────────────────────────────────────
  #[error("import contains no citizens")]
  EmptyImport,

  #[error("citizen id {0} appears more than once in the import")]
  DuplicateCitizenId(CitizenId),

  #[error("citizen {citizen_id} lists relative {relative_id} more than once")]
  DuplicateRelative {
    citizen_id:  CitizenId,
    relative_id: CitizenId,
  },

  #[error("citizen {0} cannot be their own relative")]
  SelfRelation(CitizenId),

  #[error("citizen {citizen_id} lists unknown relative {relative_id}")]
  UnknownRelative {
    citizen_id:  CitizenId,
    relative_id: CitizenId,
  },

  #[error(
    "citizen {citizen_id} lists {relative_id} as a relative, but not the other way round"
  )]
  AsymmetricRelation {
    citizen_id:  CitizenId,
    relative_id: CitizenId,
  },

  // ── Lookups ───────────────────────────────────────────────────────────
  #[error("import {0} not found")]
  ImportNotFound(ImportId),

  #[error("citizen {citizen_id} not found in import {import_id}")]
  CitizenNotFound {
    import_id:  ImportId,
    citizen_id: CitizenId,
  },

  // ── Backend ───────────────────────────────────────────────────────────
  /// A transient write conflict (lock contention); safe to retry.
  #[error("write conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification used by outer layers to choose a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Invalid,
  NotFound,
  Conflict,
  Internal,
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidField { .. }
      | Self::EmptyImport
      | Self::DuplicateCitizenId(_)
      | Self::DuplicateRelative { .. }
      | Self::SelfRelation(_)
      | Self::UnknownRelative { .. }
      | Self::AsymmetricRelation { .. } => ErrorKind::Invalid,
      Self::ImportNotFound(_) | Self::CitizenNotFound { .. } => {
        ErrorKind::NotFound
      }
      Self::Conflict(_) => ErrorKind::Conflict,
      Self::Store(_) => ErrorKind::Internal,
    }
  }

  /// Short machine-checkable tag carried in error responses.
  pub fn reason(&self) -> &'static str {
    match self {
      Self::InvalidField { .. } => "invalid_field",
      Self::EmptyImport => "empty_import",
      Self::DuplicateCitizenId(_) => "duplicate_citizen_id",
      Self::DuplicateRelative { .. } => "duplicate_relative",
      Self::SelfRelation(_) => "self_relation",
      Self::UnknownRelative { .. } => "unknown_relative",
      Self::AsymmetricRelation { .. } => "asymmetric_relation",
      Self::ImportNotFound(_) => "import_not_found",
      Self::CitizenNotFound { .. } => "citizen_not_found",
      Self::Conflict(_) => "conflict",
      Self::Store(_) => "internal",
    }
  }

  pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
    Self::InvalidField { field, reason: reason.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
