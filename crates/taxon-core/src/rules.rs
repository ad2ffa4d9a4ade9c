//! Integrity rules for the tree and the label relation.
//!
//! Everything here is pure. A backend performs the lookups (does the parent
//! row exist? who holds this code?) and hands the answers to these
//! functions, which decide the outcome.

use crate::{Error, Id, Level, Result};

// ─── Parent references ───────────────────────────────────────────────────────

/// The level a `child` must be attached to. Fails for the root, which has no
/// parent.
pub fn required_parent(child: Level) -> Result<Level> {
  child
    .parent()
    .ok_or_else(|| Error::Validation(format!("{child} is the root level and takes no parent")))
}

/// Decide whether a `child` row may point at `parent_id`, given whether the
/// backend found a row with that id at the required parent level.
pub fn validate_parent_exists(child: Level, parent_id: Id, parent_found: bool) -> Result<()> {
  let level = required_parent(child)?;
  if parent_found {
    Ok(())
  } else {
    Err(Error::ParentNotFound { level, id: parent_id })
  }
}

/// A node keeps its level when re-parented, so the target must sit exactly
/// one level above it.
pub fn validate_reparent(child: Level, target: Level) -> Result<()> {
  match child.parent() {
    Some(expected) if expected == target => Ok(()),
    _ => Err(Error::LevelMismatch { child, target }),
  }
}

/// Check the arguments of a children lookup: the root level lists every
/// macro theme and takes no parent; every other level needs one.
pub fn validate_children_query(level: Level, parent_id: Option<Id>) -> Result<()> {
  match (level.is_root(), parent_id) {
    (true, None) | (false, Some(_)) => Ok(()),
    (true, Some(_)) => Err(Error::Validation(format!("{level} has no parent to filter by"))),
    (false, None) => Err(Error::Validation(format!("listing {level} requires a parent id"))),
  }
}

// ─── Cascade ─────────────────────────────────────────────────────────────────

/// One deletion step of a [`CascadePlan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
  /// Remove the SubjectLabel rows of every subject under the root.
  UnlinkLabels,
  /// Remove every row of `level` under the root.
  Descendants(Level),
  /// Remove the root row itself.
  Root(Level),
}

/// Ordered deletion steps for removing `id` at `level` and everything below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadePlan {
  pub level: Level,
  pub id:    Id,
  pub steps: Vec<CascadeStep>,
}

/// Children always go before their parent; association rows go before the
/// subjects they reference; the root goes last.
pub fn cascade_plan(level: Level, id: Id) -> CascadePlan {
  let mut steps = vec![CascadeStep::UnlinkLabels];
  let mut below: Vec<Level> = level.descendants().collect();
  below.reverse();
  steps.extend(below.into_iter().map(CascadeStep::Descendants));
  steps.push(CascadeStep::Root(level));
  CascadePlan { level, id, steps }
}

impl CascadePlan {
  /// Levels removed by this plan, deepest first, ending with the root level.
  pub fn levels(&self) -> impl Iterator<Item = Level> + '_ {
    self.steps.iter().filter_map(|s| match s {
      CascadeStep::Descendants(l) | CascadeStep::Root(l) => Some(*l),
      CascadeStep::UnlinkLabels => None,
    })
  }
}

// ─── Labels ──────────────────────────────────────────────────────────────────

/// `holder` is the id of the label currently using `code`, if any. `own_id`
/// is the label being written (`None` on create), which may keep its code.
pub fn unique_label_code(code: i64, holder: Option<Id>, own_id: Option<Id>) -> Result<()> {
  match holder {
    Some(h) if Some(h) != own_id => Err(Error::DuplicateCode(code)),
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_parent_reports_parent_level() {
    let err = validate_parent_exists(Level::Discipline, 42, false).unwrap_err();
    assert!(matches!(err, Error::ParentNotFound { level: Level::SubArea, id: 42 }));
    assert!(validate_parent_exists(Level::Discipline, 42, true).is_ok());
  }

  #[test]
  fn root_takes_no_parent() {
    assert!(matches!(
      validate_parent_exists(Level::MacroTheme, 1, true),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn reparent_must_target_the_level_above() {
    assert!(validate_reparent(Level::Discipline, Level::SubArea).is_ok());
    assert!(matches!(
      validate_reparent(Level::Discipline, Level::Area),
      Err(Error::LevelMismatch { child: Level::Discipline, target: Level::Area })
    ));
    assert!(validate_reparent(Level::MacroTheme, Level::MacroTheme).is_err());
  }

  #[test]
  fn children_query_needs_parent_below_root() {
    assert!(validate_children_query(Level::MacroTheme, None).is_ok());
    assert!(validate_children_query(Level::Area, Some(1)).is_ok());
    assert!(validate_children_query(Level::MacroTheme, Some(1)).is_err());
    assert!(validate_children_query(Level::Subject, None).is_err());
  }

  #[test]
  fn cascade_from_root_is_deepest_first() {
    let plan = cascade_plan(Level::MacroTheme, 9);
    assert_eq!(plan.steps, vec![
      CascadeStep::UnlinkLabels,
      CascadeStep::Descendants(Level::Subject),
      CascadeStep::Descendants(Level::Discipline),
      CascadeStep::Descendants(Level::SubArea),
      CascadeStep::Descendants(Level::Area),
      CascadeStep::Root(Level::MacroTheme),
    ]);
    assert_eq!(plan.levels().last(), Some(Level::MacroTheme));
  }

  #[test]
  fn cascade_from_subject_unlinks_then_removes() {
    let plan = cascade_plan(Level::Subject, 3);
    assert_eq!(plan.steps, vec![CascadeStep::UnlinkLabels, CascadeStep::Root(Level::Subject)]);
  }

  #[test]
  fn label_code_may_be_kept_by_its_owner() {
    assert!(unique_label_code(5, None, None).is_ok());
    assert!(matches!(unique_label_code(5, Some(1), None), Err(Error::DuplicateCode(5))));
    assert!(unique_label_code(5, Some(1), Some(1)).is_ok());
    assert!(unique_label_code(5, Some(1), Some(2)).is_err());
  }
}
