//! The `TaxonomyStore` trait: the sole point of contact with persistent
//! storage.
//!
//! The trait is implemented by storage backends (e.g. `taxon-store-sqlite`).
//! Higher layers (`taxon-api`, `taxon-cli`) depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::{
  Classify, Id, Level,
  entity::{HierarchyRow, Label, NewLabel, Node, SubjectHierarchy, SubjectLabel, TreeNode},
};

/// Abstraction over a taxonomy store backend.
///
/// Every write runs as one atomic unit: it either fully applies or leaves the
/// store untouched. Integrity rules from [`crate::rules`] are checked before
/// anything is mutated.
///
/// Names are validated by the store; a blank name fails with
/// [`ErrorKind::Validation`](crate::ErrorKind::Validation).
pub trait TaxonomyStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Tree writes ───────────────────────────────────────────────────────

  fn create_macro_theme(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Id, Self::Error>> + Send + '_;

  /// Fails with `ParentNotFound` if `macro_theme_id` does not exist.
  fn create_area(
    &self,
    name: String,
    macro_theme_id: Id,
  ) -> impl Future<Output = Result<Id, Self::Error>> + Send + '_;

  fn create_subarea(
    &self,
    name: String,
    area_id: Id,
  ) -> impl Future<Output = Result<Id, Self::Error>> + Send + '_;

  fn create_discipline(
    &self,
    name: String,
    subarea_id: Id,
  ) -> impl Future<Output = Result<Id, Self::Error>> + Send + '_;

  fn create_subject(
    &self,
    name: String,
    discipline_id: Id,
  ) -> impl Future<Output = Result<Id, Self::Error>> + Send + '_;

  fn update_macro_theme(
    &self,
    id: Id,
    name: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Renames and/or re-parents an area. Fails with `NotFound` for an
  /// unknown `id` and `ParentNotFound` for an unknown new parent.
  fn update_area(
    &self,
    id: Id,
    name: String,
    macro_theme_id: Id,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn update_subarea(
    &self,
    id: Id,
    name: String,
    area_id: Id,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn update_discipline(
    &self,
    id: Id,
    name: String,
    subarea_id: Id,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn update_subject(
    &self,
    id: Id,
    name: String,
    discipline_id: Id,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a node and everything beneath it, following
  /// [`cascade_plan`](crate::rules::cascade_plan). Returns `false` if the
  /// node was already absent.
  fn delete(
    &self,
    level: Level,
    id: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Labels ────────────────────────────────────────────────────────────

  /// Fails with `DuplicateCode` if the code is taken, including when a
  /// concurrent writer wins the race at the storage constraint.
  fn create_label(
    &self,
    label: NewLabel,
  ) -> impl Future<Output = Result<Id, Self::Error>> + Send + '_;

  fn update_label(
    &self,
    id: Id,
    label: NewLabel,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Removes the label and its associations. Returns `false` if absent.
  fn delete_label(&self, id: Id) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Fails with `NotFound` if either side is missing and `Conflict` if the
  /// pair is already linked.
  fn link_subject_label(
    &self,
    subject_id: Id,
    label_id: Id,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` if the pair was not linked.
  fn unlink_subject_label(
    &self,
    subject_id: Id,
    label_id: Id,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Children at `level` under `parent_id`, sorted by name. The root level
  /// takes `None` and lists every macro theme; every other level requires a
  /// parent id.
  fn get_children(
    &self,
    level: Level,
    parent_id: Option<Id>,
  ) -> impl Future<Output = Result<Vec<Node>, Self::Error>> + Send + '_;

  fn get_node(
    &self,
    level: Level,
    id: Id,
  ) -> impl Future<Output = Result<Option<TreeNode>, Self::Error>> + Send + '_;

  /// Every row at `level`, sorted by name.
  fn list_level(
    &self,
    level: Level,
  ) -> impl Future<Output = Result<Vec<TreeNode>, Self::Error>> + Send + '_;

  /// Fails with `NotFound` if the subject does not exist.
  fn get_full_hierarchy_for_subject(
    &self,
    subject_id: Id,
  ) -> impl Future<Output = Result<SubjectHierarchy, Self::Error>> + Send + '_;

  /// One row per (subject, label) pair, untagged subjects included once
  /// with no label. Sorted by the five names, then label code.
  fn get_all_subjects_with_hierarchy(
    &self,
  ) -> impl Future<Output = Result<Vec<HierarchyRow>, Self::Error>> + Send + '_;

  fn get_label(
    &self,
    id: Id,
  ) -> impl Future<Output = Result<Option<Label>, Self::Error>> + Send + '_;

  /// Every label, sorted by code.
  fn list_labels(&self) -> impl Future<Output = Result<Vec<Label>, Self::Error>> + Send + '_;

  /// Every association row.
  fn list_links(
    &self,
  ) -> impl Future<Output = Result<Vec<SubjectLabel>, Self::Error>> + Send + '_;
}
