//! Error types for `taxon-core`.

use thiserror::Error;

use crate::{Id, Level};

#[derive(Debug, Error)]
pub enum Error {
  #[error("{level} {id} does not exist and cannot be used as a parent")]
  ParentNotFound { level: Level, id: Id },

  #[error("label code {0} is already in use")]
  DuplicateCode(i64),

  #[error("subject {subject_id} is already linked to label {label_id}")]
  Conflict { subject_id: Id, label_id: Id },

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: Id },

  #[error("a {child} cannot be placed under a {target}")]
  LevelMismatch { child: Level, target: Level },

  #[error("validation failed: {0}")]
  Validation(String),
}

impl Error {
  pub fn not_found(level: Level, id: Id) -> Self {
    Self::NotFound { entity: level.into(), id }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// Coarse error category shared by every backend, so generic callers can
/// branch on the outcome without knowing the concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  ParentNotFound,
  DuplicateCode,
  Conflict,
  NotFound,
  Validation,
  Storage,
}

pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::ParentNotFound { .. } => ErrorKind::ParentNotFound,
      Self::DuplicateCode(_) => ErrorKind::DuplicateCode,
      Self::Conflict { .. } => ErrorKind::Conflict,
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::LevelMismatch { .. } | Self::Validation(_) => ErrorKind::Validation,
    }
  }
}
