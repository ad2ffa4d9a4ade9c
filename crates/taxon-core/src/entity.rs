//! Entity records and read shapes.
//!
//! Records carry no behaviour beyond construction-time validation; they are
//! the data-transfer shape between a [`TaxonomyStore`](crate::store::TaxonomyStore)
//! and its callers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Id, Level, Result};

// ─── Name ────────────────────────────────────────────────────────────────────

/// A required display name: trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
  pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
    let trimmed = raw.as_ref().trim();
    if trimmed.is_empty() {
      return Err(Error::Validation("name must not be empty".into()));
    }
    Ok(Self(trimmed.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for Name {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Tree records ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroTheme {
  pub id:         Id,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
  pub id:             Id,
  pub name:           String,
  pub macro_theme_id: Id,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubArea {
  pub id:         Id,
  pub name:       String,
  pub area_id:    Id,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discipline {
  pub id:         Id,
  pub name:       String,
  pub subarea_id: Id,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub id:            Id,
  pub name:          String,
  pub discipline_id: Id,
  pub created_at:    DateTime<Utc>,
}

/// Any tree row, with its parent reference flattened to an optional id.
/// `parent_id` is `None` exactly when `level` is the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
  pub level:      Level,
  pub id:         Id,
  pub name:       String,
  pub parent_id:  Option<Id>,
  pub created_at: DateTime<Utc>,
}

impl TreeNode {
  /// Convert into the level-specific record, naming the parent reference by
  /// its column (`macro_theme_id`, `area_id`, ...).
  pub fn into_record(self) -> Result<Record> {
    let Self { level, id, name, parent_id, created_at } = self;
    let parent = |p: Option<Id>| {
      p.ok_or_else(|| Error::Validation(format!("{level} {id} has no parent reference")))
    };
    Ok(match level {
      Level::MacroTheme => Record::MacroTheme(MacroTheme { id, name, created_at }),
      Level::Area => Record::Area(Area { id, name, macro_theme_id: parent(parent_id)?, created_at }),
      Level::SubArea => Record::SubArea(SubArea { id, name, area_id: parent(parent_id)?, created_at }),
      Level::Discipline => {
        Record::Discipline(Discipline { id, name, subarea_id: parent(parent_id)?, created_at })
      }
      Level::Subject => {
        Record::Subject(Subject { id, name, discipline_id: parent(parent_id)?, created_at })
      }
    })
  }
}

/// A tree row in its level-specific shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Record {
  MacroTheme(MacroTheme),
  Area(Area),
  SubArea(SubArea),
  Discipline(Discipline),
  Subject(Subject),
}

// ─── Labels ──────────────────────────────────────────────────────────────────

/// An independent tag with a globally unique numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
  pub id:          Id,
  pub code:        i64,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

impl Label {
  /// `"LBL {code} - {name}"`, the form used in listings and reports.
  pub fn display_name(&self) -> String { label_display(self.code, &self.name) }
}

/// Render a label as `"LBL {code} - {name}"`.
pub fn label_display(code: i64, name: &str) -> String {
  format!("LBL {code} - {name}")
}

/// Input to [`crate::store::TaxonomyStore::create_label`] and
/// [`update_label`](crate::store::TaxonomyStore::update_label).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLabel {
  pub code:        i64,
  pub name:        Name,
  /// Never `Some("")`: blank descriptions collapse to `None`.
  pub description: Option<String>,
}

impl NewLabel {
  pub fn new(
    code: i64,
    name: impl AsRef<str>,
    description: Option<impl Into<String>>,
  ) -> Result<Self> {
    let description = description
      .map(Into::into)
      .map(|d: String| d.trim().to_owned())
      .filter(|d| !d.is_empty());
    Ok(Self { code, name: Name::parse(name)?, description })
  }
}

/// A Subject–Label association row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectLabel {
  pub subject_id: Id,
  pub label_id:   Id,
}

// ─── Read shapes ─────────────────────────────────────────────────────────────

/// An `(id, name)` pair, as used to populate a cascading selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
  pub id:   Id,
  pub name: String,
}

/// The full chain of names from a subject up to its macro theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectHierarchy {
  pub subject_id:  Id,
  pub macro_theme: String,
  pub area:        String,
  pub subarea:     String,
  pub discipline:  String,
  pub subject:     String,
}

impl SubjectHierarchy {
  /// The five names, root first.
  pub fn path(&self) -> [&str; 5] {
    [&self.macro_theme, &self.area, &self.subarea, &self.discipline, &self.subject]
  }
}

/// One row of the flattened hierarchy listing: a subject chain paired with
/// one of its labels, or with no label when the subject is untagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyRow {
  #[serde(flatten)]
  pub hierarchy: SubjectHierarchy,
  pub label:     Option<String>,
}

/// A named group and the number of items counted under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRow {
  pub id:    Id,
  pub name:  String,
  pub count: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn name_is_trimmed() {
    assert_eq!(Name::parse("  Álgebra ").unwrap().as_str(), "Álgebra");
  }

  #[test]
  fn blank_name_is_rejected() {
    assert!(matches!(Name::parse(""), Err(Error::Validation(_))));
    assert!(matches!(Name::parse(" \t\n"), Err(Error::Validation(_))));
  }

  #[test]
  fn blank_description_becomes_none() {
    let l = NewLabel::new(1, "LBL1", Some("   ")).unwrap();
    assert_eq!(l.description, None);
    let l = NewLabel::new(1, "LBL1", None::<String>).unwrap();
    assert_eq!(l.description, None);
    let l = NewLabel::new(1, "LBL1", Some(" Linear systems ")).unwrap();
    assert_eq!(l.description.as_deref(), Some("Linear systems"));
  }

  #[test]
  fn tree_node_becomes_level_record() {
    let node = TreeNode {
      level:      Level::Discipline,
      id:         4,
      name:       "Álgebra Linear".into(),
      parent_id:  Some(3),
      created_at: Utc::now(),
    };
    match node.into_record().unwrap() {
      Record::Discipline(d) => {
        assert_eq!(d.subarea_id, 3);
        assert_eq!(d.name, "Álgebra Linear");
      }
      other => panic!("unexpected record: {other:?}"),
    }
  }

  #[test]
  fn non_root_without_parent_is_invalid() {
    let node = TreeNode {
      level:      Level::Area,
      id:         2,
      name:       "Matemática".into(),
      parent_id:  None,
      created_at: Utc::now(),
    };
    assert!(matches!(node.into_record(), Err(Error::Validation(_))));
  }

  #[test]
  fn label_display_name() {
    let l = Label {
      id:          1,
      code:        7,
      name:        "LBL7".into(),
      description: None,
      created_at:  Utc::now(),
    };
    assert_eq!(l.display_name(), "LBL 7 - LBL7");
  }
}
