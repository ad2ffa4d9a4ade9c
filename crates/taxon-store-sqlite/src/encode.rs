//! Encoding and decoding helpers between domain types and the plain column
//! values stored in SQLite.
//!
//! Timestamps are stored as RFC 3339 strings. Rows are first read into
//! `Raw*` structs of plain column values inside the connection thread, then
//! decoded into domain types outside it.

use chrono::{DateTime, Utc};
use taxon_core::{
  Id, Level,
  entity::{HierarchyRow, Label, SubjectHierarchy, TreeNode, label_display},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Constraint classification ───────────────────────────────────────────────

/// Whether `e` is a UNIQUE or PRIMARY KEY violation, i.e. a lost race on a
/// uniqueness rule rather than a generic failure.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
  match e {
    rusqlite::Error::SqliteFailure(err, _) => matches!(
      err.extended_code,
      rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    ),
    _ => false,
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns of a tree row: `(id, name, parent_id, created_at)`.
pub struct RawNode {
  pub id:         Id,
  pub name:       String,
  pub parent_id:  Option<Id>,
  pub created_at: String,
}

impl RawNode {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      name:       row.get(1)?,
      parent_id:  row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_node(self, level: Level) -> Result<TreeNode> {
    Ok(TreeNode {
      level,
      id: self.id,
      name: self.name,
      parent_id: self.parent_id,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw columns of a `label` row.
pub struct RawLabel {
  pub id:          Id,
  pub code:        i64,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
}

impl RawLabel {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      code:        row.get(1)?,
      name:        row.get(2)?,
      description: row.get(3)?,
      created_at:  row.get(4)?,
    })
  }

  pub fn into_label(self) -> Result<Label> {
    Ok(Label {
      id:          self.id,
      code:        self.code,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub fn hierarchy_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SubjectHierarchy> {
  Ok(SubjectHierarchy {
    subject_id:  row.get(0)?,
    macro_theme: row.get(1)?,
    area:        row.get(2)?,
    subarea:     row.get(3)?,
    discipline:  row.get(4)?,
    subject:     row.get(5)?,
  })
}

/// A hierarchy row followed by the (nullable) `label.code, label.name` of a
/// left join.
pub fn hierarchy_row_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HierarchyRow> {
  let code: Option<i64> = row.get(6)?;
  let name: Option<String> = row.get(7)?;
  Ok(HierarchyRow {
    hierarchy: hierarchy_from_row(row)?,
    label:     code.zip(name).map(|(code, name)| label_display(code, &name)),
  })
}
