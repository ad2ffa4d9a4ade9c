//! The five fixed levels of the classification tree.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// A level of the tree, ordered root-first:
/// `MacroTheme < Area < SubArea < Discipline < Subject`.
///
/// The snake_case name (`macro_theme`, `area`, `subarea`, `discipline`,
/// `subject`) is used in URLs, error messages and the CLI.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Level {
  MacroTheme,
  Area,
  #[serde(rename = "subarea")]
  #[strum(to_string = "subarea")]
  SubArea,
  Discipline,
  Subject,
}

impl Level {
  /// Every level, root first.
  pub const ALL: [Level; 5] = [
    Level::MacroTheme,
    Level::Area,
    Level::SubArea,
    Level::Discipline,
    Level::Subject,
  ];

  /// 1 for the root, 5 for the leaf.
  pub fn depth(self) -> u8 {
    match self {
      Self::MacroTheme => 1,
      Self::Area => 2,
      Self::SubArea => 3,
      Self::Discipline => 4,
      Self::Subject => 5,
    }
  }

  pub fn parent(self) -> Option<Level> {
    match self {
      Self::MacroTheme => None,
      Self::Area => Some(Self::MacroTheme),
      Self::SubArea => Some(Self::Area),
      Self::Discipline => Some(Self::SubArea),
      Self::Subject => Some(Self::Discipline),
    }
  }

  pub fn child(self) -> Option<Level> {
    match self {
      Self::MacroTheme => Some(Self::Area),
      Self::Area => Some(Self::SubArea),
      Self::SubArea => Some(Self::Discipline),
      Self::Discipline => Some(Self::Subject),
      Self::Subject => None,
    }
  }

  pub fn is_root(self) -> bool { self.parent().is_none() }

  pub fn is_leaf(self) -> bool { self.child().is_none() }

  /// Strictly deeper levels, nearest first.
  pub fn descendants(self) -> impl Iterator<Item = Level> {
    std::iter::successors(self.child(), |l| l.child())
  }

  /// Human-readable singular title.
  pub fn title(self) -> &'static str {
    match self {
      Self::MacroTheme => "Macro theme",
      Self::Area => "Area",
      Self::SubArea => "Sub-area",
      Self::Discipline => "Discipline",
      Self::Subject => "Subject",
    }
  }
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn parent_and_child_are_inverse() {
    for level in Level::iter() {
      if let Some(child) = level.child() {
        assert_eq!(child.parent(), Some(level));
        assert_eq!(child.depth(), level.depth() + 1);
      }
    }
  }

  #[test]
  fn all_matches_iteration_order() {
    assert_eq!(Level::iter().collect::<Vec<_>>(), Level::ALL.to_vec());
  }

  #[test]
  fn descendants_of_root_cover_the_tree() {
    let below: Vec<_> = Level::MacroTheme.descendants().collect();
    assert_eq!(below, Level::ALL[1..].to_vec());
    assert_eq!(Level::Subject.descendants().count(), 0);
  }

  #[test]
  fn names_round_trip_through_strum_and_serde() {
    assert_eq!(Level::SubArea.to_string(), "subarea");
    assert_eq!(Level::MacroTheme.to_string(), "macro_theme");
    assert_eq!(Level::from_str("subarea").unwrap(), Level::SubArea);
    let json = serde_json::to_string(&Level::SubArea).unwrap();
    assert_eq!(json, "\"subarea\"");
    let static_name: &'static str = Level::Discipline.into();
    assert_eq!(static_name, "discipline");
  }
}
