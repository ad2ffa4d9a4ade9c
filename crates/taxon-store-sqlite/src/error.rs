//! Error type for `taxon-store-sqlite`.

use std::fmt::Display;

use taxon_core::{Classify, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An integrity rule rejected the operation; nothing was written.
  #[error(transparent)]
  Core(#[from] taxon_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A database failure during a named operation.
  #[error("{op} failed on {target}: {source}")]
  Storage {
    op:     &'static str,
    target: String,
    #[source]
    source: tokio_rusqlite::Error,
  },

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Core(e) => e.kind(),
      Self::Database(_) | Self::Storage { .. } | Self::DateParse(_) => ErrorKind::Storage,
    }
  }
}

/// Attach the operation name and target (entity level and id) to a raw
/// database failure.
pub(crate) trait StorageContext<T> {
  fn context(self, op: &'static str, target: impl Display) -> Result<T>;
}

impl<T> StorageContext<T> for std::result::Result<T, tokio_rusqlite::Error> {
  fn context(self, op: &'static str, target: impl Display) -> Result<T> {
    self.map_err(|source| Error::Storage { op, target: target.to_string(), source })
  }
}
