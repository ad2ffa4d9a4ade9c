//! Read-only aggregation queries for reporting views.
//!
//! Reports never touch storage directly. A [`TaxonomySnapshot`] is loaded
//! through the ordinary [`TaxonomyStore`] reads and every rollup is a pure
//! function over it.
//!
//! Join policy per query:
//!
//! | Query | Zero-count groups |
//! |---|---|
//! | [`subjects_per_label`](TaxonomySnapshot::subjects_per_label) | kept |
//! | [`subjects_per_macro_theme`](TaxonomySnapshot::subjects_per_macro_theme) | kept |
//! | [`subjects_per_macro_theme_for_label`](TaxonomySnapshot::subjects_per_macro_theme_for_label) | dropped |
//! | [`fan_out`](TaxonomySnapshot::fan_out) | kept |
//!
//! Count rows are ordered by count descending, then name ascending, then id.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::{
  Error, Id, Level, Result,
  entity::{CountRow, Label, Node, SubjectHierarchy, SubjectLabel, TreeNode},
  store::TaxonomyStore,
};

/// A copy of the whole taxonomy for aggregation.
///
/// [`load`](Self::load) issues one read per level plus one each for labels
/// and links, with no transaction spanning them. A write that lands between
/// reads can leave the snapshot torn (a link whose subject is missing, or a
/// child whose parent is). Rollups skip rows whose references do not resolve
/// in the snapshot, so a torn read undercounts rather than fails.
#[derive(Debug, Clone, Default)]
pub struct TaxonomySnapshot {
  nodes:  HashMap<Level, Vec<TreeNode>>,
  labels: Vec<Label>,
  links:  Vec<SubjectLabel>,
}

/// Both orphan listings, as served to the "untagged / empty" views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Orphans {
  pub macro_themes_without_areas: Vec<Node>,
  pub subjects_without_labels:    Vec<SubjectHierarchy>,
}

impl TaxonomySnapshot {
  pub fn new(nodes: Vec<TreeNode>, labels: Vec<Label>, links: Vec<SubjectLabel>) -> Self {
    let mut by_level: HashMap<Level, Vec<TreeNode>> = HashMap::new();
    for node in nodes {
      by_level.entry(node.level).or_default().push(node);
    }
    Self { nodes: by_level, labels, links }
  }

  /// Read every level, label and link from `store`, root level first.
  pub async fn load<S: TaxonomyStore>(store: &S) -> Result<Self, S::Error> {
    let mut nodes = Vec::new();
    for level in Level::ALL {
      nodes.extend(store.list_level(level).await?);
    }
    let labels = store.list_labels().await?;
    let links = store.list_links().await?;
    Ok(Self::new(nodes, labels, links))
  }

  fn level(&self, level: Level) -> &[TreeNode] {
    self.nodes.get(&level).map(Vec::as_slice).unwrap_or_default()
  }

  fn index(&self, level: Level) -> HashMap<Id, &TreeNode> {
    self.level(level).iter().map(|n| (n.id, n)).collect()
  }

  pub fn total_subjects(&self) -> u64 { self.level(Level::Subject).len() as u64 }

  // ── Counts ────────────────────────────────────────────────────────────

  /// Subjects per label; labels with no subjects are reported with 0.
  pub fn subjects_per_label(&self) -> Vec<CountRow> {
    let subjects = self.index(Level::Subject);
    let mut per_label: HashMap<Id, u64> = HashMap::new();
    for link in self.links.iter().filter(|l| subjects.contains_key(&l.subject_id)) {
      *per_label.entry(link.label_id).or_default() += 1;
    }
    let rows = self
      .labels
      .iter()
      .map(|l| CountRow {
        id:    l.id,
        name:  l.display_name(),
        count: per_label.get(&l.id).copied().unwrap_or(0),
      })
      .collect();
    sort_counts(rows)
  }

  /// Subjects per macro theme through all five levels; macro themes with no
  /// subjects are reported with 0.
  pub fn subjects_per_macro_theme(&self) -> Vec<CountRow> {
    let roots = self.subject_roots();
    let mut per_root: HashMap<Id, u64> = HashMap::new();
    for root in roots.values() {
      *per_root.entry(*root).or_default() += 1;
    }
    let rows = self
      .level(Level::MacroTheme)
      .iter()
      .map(|mt| CountRow {
        id:    mt.id,
        name:  mt.name.clone(),
        count: per_root.get(&mt.id).copied().unwrap_or(0),
      })
      .collect();
    sort_counts(rows)
  }

  /// Subjects tagged with `label_id`, per macro theme. Only macro themes with
  /// at least one tagged subject appear.
  pub fn subjects_per_macro_theme_for_label(&self, label_id: Id) -> Vec<CountRow> {
    let roots = self.subject_roots();
    let mut per_root: HashMap<Id, u64> = HashMap::new();
    for link in self.links.iter().filter(|l| l.label_id == label_id) {
      if let Some(root) = roots.get(&link.subject_id) {
        *per_root.entry(*root).or_default() += 1;
      }
    }
    let rows = self
      .level(Level::MacroTheme)
      .iter()
      .filter_map(|mt| {
        per_root.get(&mt.id).map(|count| CountRow {
          id:    mt.id,
          name:  mt.name.clone(),
          count: *count,
        })
      })
      .collect();
    sort_counts(rows)
  }

  /// Direct children per node of `parent_level` (areas per macro theme,
  /// sub-areas per area, ...). Childless parents are reported with 0.
  pub fn fan_out(&self, parent_level: Level) -> Result<Vec<CountRow>> {
    let child_level = parent_level.child().ok_or_else(|| {
      Error::Validation(format!("{parent_level} is the leaf level and has no children"))
    })?;
    let mut per_parent: HashMap<Id, u64> = HashMap::new();
    for child in self.level(child_level) {
      if let Some(p) = child.parent_id {
        *per_parent.entry(p).or_default() += 1;
      }
    }
    let rows = self
      .level(parent_level)
      .iter()
      .map(|n| CountRow {
        id:    n.id,
        name:  n.name.clone(),
        count: per_parent.get(&n.id).copied().unwrap_or(0),
      })
      .collect();
    Ok(sort_counts(rows))
  }

  // ── Orphans ───────────────────────────────────────────────────────────

  pub fn macro_themes_without_areas(&self) -> Vec<Node> {
    let with_areas: HashSet<Id> =
      self.level(Level::Area).iter().filter_map(|a| a.parent_id).collect();
    let mut out: Vec<Node> = self
      .level(Level::MacroTheme)
      .iter()
      .filter(|mt| !with_areas.contains(&mt.id))
      .map(|mt| Node { id: mt.id, name: mt.name.clone() })
      .collect();
    out.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    out
  }

  pub fn subjects_without_labels(&self) -> Vec<SubjectHierarchy> {
    let tagged: HashSet<Id> = self.links.iter().map(|l| l.subject_id).collect();
    self.hierarchies(|id| !tagged.contains(&id))
  }

  pub fn orphans(&self) -> Orphans {
    Orphans {
      macro_themes_without_areas: self.macro_themes_without_areas(),
      subjects_without_labels:    self.subjects_without_labels(),
    }
  }

  /// Full chains of every subject tagged with `label_id`.
  pub fn subjects_for_label(&self, label_id: Id) -> Vec<SubjectHierarchy> {
    let tagged: HashSet<Id> = self
      .links
      .iter()
      .filter(|l| l.label_id == label_id)
      .map(|l| l.subject_id)
      .collect();
    self.hierarchies(|id| tagged.contains(&id))
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  /// Map each subject id to the id of its macro theme. Subjects whose chain
  /// is broken (which the store's foreign keys rule out) are skipped.
  fn subject_roots(&self) -> HashMap<Id, Id> {
    let indexes: Vec<HashMap<Id, &TreeNode>> =
      [Level::Discipline, Level::SubArea, Level::Area].map(|l| self.index(l)).into();
    self
      .level(Level::Subject)
      .iter()
      .filter_map(|s| {
        let mut parent = s.parent_id?;
        for index in &indexes {
          parent = index.get(&parent)?.parent_id?;
        }
        Some((s.id, parent))
      })
      .collect()
  }

  fn hierarchies(&self, keep: impl Fn(Id) -> bool) -> Vec<SubjectHierarchy> {
    let disciplines = self.index(Level::Discipline);
    let subareas = self.index(Level::SubArea);
    let areas = self.index(Level::Area);
    let macro_themes = self.index(Level::MacroTheme);

    let mut out: Vec<SubjectHierarchy> = self
      .level(Level::Subject)
      .iter()
      .filter(|s| keep(s.id))
      .filter_map(|s| {
        let d = disciplines.get(&s.parent_id?)?;
        let sa = subareas.get(&d.parent_id?)?;
        let a = areas.get(&sa.parent_id?)?;
        let mt = macro_themes.get(&a.parent_id?)?;
        Some(SubjectHierarchy {
          subject_id:  s.id,
          macro_theme: mt.name.clone(),
          area:        a.name.clone(),
          subarea:     sa.name.clone(),
          discipline:  d.name.clone(),
          subject:     s.name.clone(),
        })
      })
      .collect();
    out.sort_by(|a, b| a.path().cmp(&b.path()).then(a.subject_id.cmp(&b.subject_id)));
    out
  }
}

fn sort_counts(mut rows: Vec<CountRow>) -> Vec<CountRow> {
  rows.sort_by(|a, b| {
    b.count
      .cmp(&a.count)
      .then_with(|| a.name.cmp(&b.name))
      .then(a.id.cmp(&b.id))
  });
  rows
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;

  fn node(level: Level, id: Id, name: &str, parent_id: Option<Id>) -> TreeNode {
    TreeNode { level, id, name: name.into(), parent_id, created_at: Utc::now() }
  }

  fn label(id: Id, code: i64) -> Label {
    Label {
      id,
      code,
      name: format!("LBL{code}"),
      description: None,
      created_at: Utc::now(),
    }
  }

  /// Two macro themes; "Formação Básica" holds two subjects, "Saúde" holds
  /// an area but no subjects, "Vazio" holds nothing at all.
  fn sample() -> TaxonomySnapshot {
    TaxonomySnapshot::new(
      vec![
        node(Level::MacroTheme, 1, "Formação Básica", None),
        node(Level::MacroTheme, 2, "Saúde", None),
        node(Level::MacroTheme, 3, "Vazio", None),
        node(Level::Area, 10, "Matemática", Some(1)),
        node(Level::Area, 11, "Enfermagem", Some(2)),
        node(Level::SubArea, 20, "Álgebra", Some(10)),
        node(Level::Discipline, 30, "Álgebra Linear", Some(20)),
        node(Level::Subject, 40, "Matrizes", Some(30)),
        node(Level::Subject, 41, "Determinantes", Some(30)),
      ],
      vec![label(100, 7), label(101, 8)],
      vec![SubjectLabel { subject_id: 40, label_id: 100 }],
    )
  }

  #[test]
  fn empty_snapshot_yields_empty_reports() {
    let snap = TaxonomySnapshot::default();
    assert!(snap.subjects_per_macro_theme().is_empty());
    assert!(snap.subjects_per_label().is_empty());
    assert!(snap.fan_out(Level::MacroTheme).unwrap().is_empty());
    assert_eq!(snap.total_subjects(), 0);
  }

  #[test]
  fn subjects_per_macro_theme_keeps_zero_rows() {
    let rows = sample().subjects_per_macro_theme();
    let summary: Vec<_> = rows.iter().map(|r| (r.name.as_str(), r.count)).collect();
    assert_eq!(summary, vec![("Formação Básica", 2), ("Saúde", 0), ("Vazio", 0)]);
  }

  #[test]
  fn subjects_per_label_keeps_unused_labels() {
    let rows = sample().subjects_per_label();
    let summary: Vec<_> = rows.iter().map(|r| (r.name.as_str(), r.count)).collect();
    assert_eq!(summary, vec![("LBL 7 - LBL7", 1), ("LBL 8 - LBL8", 0)]);
  }

  #[test]
  fn per_label_macro_theme_counts_drop_zero_rows() {
    let snap = sample();
    let rows = snap.subjects_per_macro_theme_for_label(100);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Formação Básica");
    assert_eq!(rows[0].count, 1);
    assert!(snap.subjects_per_macro_theme_for_label(101).is_empty());
  }

  #[test]
  fn fan_out_counts_direct_children() {
    let snap = sample();
    let areas = snap.fan_out(Level::MacroTheme).unwrap();
    let summary: Vec<_> = areas.iter().map(|r| (r.id, r.count)).collect();
    assert_eq!(summary, vec![(1, 1), (2, 1), (3, 0)]);

    let subjects = snap.fan_out(Level::Discipline).unwrap();
    assert_eq!(subjects[0].count, 2);
    assert!(matches!(snap.fan_out(Level::Subject), Err(Error::Validation(_))));
  }

  #[test]
  fn orphans_are_detected() {
    let orphans = sample().orphans();
    assert_eq!(orphans.macro_themes_without_areas, vec![Node { id: 3, name: "Vazio".into() }]);
    assert_eq!(orphans.subjects_without_labels.len(), 1);
    assert_eq!(orphans.subjects_without_labels[0].subject, "Determinantes");
  }

  #[test]
  fn subjects_for_label_resolves_full_chain() {
    let rows = sample().subjects_for_label(100);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path(), [
      "Formação Básica",
      "Matemática",
      "Álgebra",
      "Álgebra Linear",
      "Matrizes"
    ]);
  }

  #[test]
  fn ties_break_by_name() {
    let rows = sort_counts(vec![
      CountRow { id: 1, name: "b".into(), count: 1 },
      CountRow { id: 2, name: "a".into(), count: 1 },
      CountRow { id: 3, name: "c".into(), count: 5 },
    ]);
    let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
  }

  #[test]
  fn torn_snapshot_skips_dangling_links() {
    // Link to subject 99, which was deleted between the subject and link reads.
    let snap = TaxonomySnapshot::new(
      vec![
        node(Level::MacroTheme, 1, "Formação Básica", None),
        node(Level::Area, 10, "Matemática", Some(1)),
        node(Level::SubArea, 20, "Álgebra", Some(10)),
        node(Level::Discipline, 30, "Álgebra Linear", Some(20)),
        node(Level::Subject, 40, "Matrizes", Some(30)),
      ],
      vec![label(100, 7)],
      vec![
        SubjectLabel { subject_id: 40, label_id: 100 },
        SubjectLabel { subject_id: 99, label_id: 100 },
      ],
    );

    assert_eq!(snap.subjects_per_label()[0].count, 1);
    assert_eq!(snap.subjects_per_macro_theme_for_label(100)[0].count, 1);
    assert_eq!(snap.subjects_for_label(100).len(), 1);
  }
}
