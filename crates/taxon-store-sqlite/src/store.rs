//! [`SqliteStore`], the SQLite implementation of [`TaxonomyStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use taxon_core::{
  Id, Level,
  entity::{HierarchyRow, Label, Name, NewLabel, Node, SubjectHierarchy, SubjectLabel, TreeNode},
  rules::{self, CascadeStep},
  store::TaxonomyStore,
};

use crate::{
  Result,
  encode::{
    RawLabel, RawNode, encode_dt, hierarchy_from_row, hierarchy_row_from_row,
    is_unique_violation,
  },
  error::StorageContext as _,
  schema::{self, LEGACY_TABLE, SCHEMA, level_sql},
};

/// Outcome of a transaction closure: the outer `Result` is a database
/// failure, the inner one an integrity rule that stopped the write.
type Checked<T> = std::result::Result<T, taxon_core::Error>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A taxonomy store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open from a database URL: `sqlite://<path>`, a bare path, or
  /// `:memory:`.
  pub async fn connect(url: &str) -> Result<Self> {
    let path = url.strip_prefix("sqlite://").unwrap_or(url);
    if path == ":memory:" {
      Self::open_in_memory().await
    } else {
      Self::open(path).await
    }
  }

  pub(crate) async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The `PRAGMA user_version` written by the schema.
  pub async fn schema_version(&self) -> Result<i64> {
    self
      .conn
      .call(|conn| Ok(conn.query_row("PRAGMA user_version", [], |r| r.get::<_, i64>(0))?))
      .await
      .context("read schema version", "database")
  }

  /// Whether the pre-normalisation table is still present.
  pub async fn legacy_table_exists(&self) -> Result<bool> {
    self
      .conn
      .call(|conn| row_exists(conn, schema::LEGACY_EXISTS, [LEGACY_TABLE]).map_err(Into::into))
      .await
      .context("inspect", LEGACY_TABLE)
  }

  pub async fn drop_legacy_table(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute(schema::LEGACY_DROP, [])?;
        Ok(())
      })
      .await
      .context("drop", LEGACY_TABLE)
  }

  /// Insert a tree row under `parent` (`(parent level, parent id)`), which
  /// must be `None` exactly for the root.
  async fn insert_node(
    &self,
    level: Level,
    name: String,
    parent: Option<(Level, Id)>,
  ) -> Result<Id> {
    let name = Name::parse(name)?.into_inner();
    match parent {
      Some((target, _)) => rules::validate_reparent(level, target)?,
      None => debug_assert!(level.is_root()),
    }
    let at_str = encode_dt(Utc::now());

    let outcome: Checked<Id> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match parent {
          Some((target, parent_id)) => {
            let found = row_exists(&tx, level_sql(target).exists, [parent_id])?;
            if let Err(e) = rules::validate_parent_exists(level, parent_id, found) {
              return Ok(Err(e));
            }
            tx.execute(level_sql(level).insert, rusqlite::params![name, parent_id, at_str])?;
          }
          None => {
            tx.execute(level_sql(level).insert, rusqlite::params![name, at_str])?;
          }
        }
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Ok(id))
      })
      .await
      .context("create", level)?;

    Ok(outcome?)
  }

  /// Rename and re-parent a tree row. The level never changes.
  async fn update_node(
    &self,
    level: Level,
    id: Id,
    name: String,
    parent: Option<(Level, Id)>,
  ) -> Result<()> {
    let name = Name::parse(name)?.into_inner();
    if let Some((target, _)) = parent {
      rules::validate_reparent(level, target)?;
    }

    let outcome: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, level_sql(level).exists, [id])? {
          return Ok(Err(taxon_core::Error::not_found(level, id)));
        }
        match parent {
          Some((target, parent_id)) => {
            let found = row_exists(&tx, level_sql(target).exists, [parent_id])?;
            if let Err(e) = rules::validate_parent_exists(level, parent_id, found) {
              return Ok(Err(e));
            }
            tx.execute(level_sql(level).update, rusqlite::params![id, name, parent_id])?;
          }
          None => {
            tx.execute(level_sql(level).update, rusqlite::params![id, name])?;
          }
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await
      .context("update", format!("{level} {id}"))?;

    Ok(outcome?)
  }
}

fn row_exists(
  conn: &rusqlite::Connection,
  sql: &str,
  params: impl rusqlite::Params,
) -> rusqlite::Result<bool> {
  Ok(conn.query_row(sql, params, |_| Ok(())).optional()?.is_some())
}

// ─── TaxonomyStore impl ──────────────────────────────────────────────────────

impl TaxonomyStore for SqliteStore {
  type Error = crate::Error;

  // ── Tree writes ───────────────────────────────────────────────────────────

  async fn create_macro_theme(&self, name: String) -> Result<Id> {
    self.insert_node(Level::MacroTheme, name, None).await
  }

  async fn create_area(&self, name: String, macro_theme_id: Id) -> Result<Id> {
    self
      .insert_node(Level::Area, name, Some((Level::MacroTheme, macro_theme_id)))
      .await
  }

  async fn create_subarea(&self, name: String, area_id: Id) -> Result<Id> {
    self.insert_node(Level::SubArea, name, Some((Level::Area, area_id))).await
  }

  async fn create_discipline(&self, name: String, subarea_id: Id) -> Result<Id> {
    self
      .insert_node(Level::Discipline, name, Some((Level::SubArea, subarea_id)))
      .await
  }

  async fn create_subject(&self, name: String, discipline_id: Id) -> Result<Id> {
    self
      .insert_node(Level::Subject, name, Some((Level::Discipline, discipline_id)))
      .await
  }

  async fn update_macro_theme(&self, id: Id, name: String) -> Result<()> {
    self.update_node(Level::MacroTheme, id, name, None).await
  }

  async fn update_area(&self, id: Id, name: String, macro_theme_id: Id) -> Result<()> {
    self
      .update_node(Level::Area, id, name, Some((Level::MacroTheme, macro_theme_id)))
      .await
  }

  async fn update_subarea(&self, id: Id, name: String, area_id: Id) -> Result<()> {
    self
      .update_node(Level::SubArea, id, name, Some((Level::Area, area_id)))
      .await
  }

  async fn update_discipline(&self, id: Id, name: String, subarea_id: Id) -> Result<()> {
    self
      .update_node(Level::Discipline, id, name, Some((Level::SubArea, subarea_id)))
      .await
  }

  async fn update_subject(&self, id: Id, name: String, discipline_id: Id) -> Result<()> {
    self
      .update_node(Level::Subject, id, name, Some((Level::Discipline, discipline_id)))
      .await
  }

  async fn delete(&self, level: Level, id: Id) -> Result<bool> {
    let plan = rules::cascade_plan(level, id);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, level_sql(level).exists, [id])? {
          return Ok(false);
        }

        // Resolve the ids under the root one level at a time.
        let mut ids: HashMap<Level, Vec<Id>> = HashMap::from([(level, vec![id])]);
        let mut current = level;
        while let (Some(child), Some(child_ids)) = (current.child(), level_sql(current).child_ids) {
          let found = {
            let mut stmt = tx.prepare(child_ids)?;
            let mut found = Vec::new();
            for parent in ids.get(&current).into_iter().flatten() {
              let rows = stmt.query_map([parent], |r| r.get::<_, Id>(0))?;
              found.extend(rows.collect::<rusqlite::Result<Vec<_>>>()?);
            }
            found
          };
          ids.insert(child, found);
          current = child;
        }

        for step in &plan.steps {
          match *step {
            CascadeStep::UnlinkLabels => {
              for subject_id in ids.get(&Level::Subject).into_iter().flatten() {
                tx.execute(schema::LINK_DELETE_FOR_SUBJECT, [subject_id])?;
              }
            }
            CascadeStep::Descendants(l) | CascadeStep::Root(l) => {
              for row_id in ids.get(&l).into_iter().flatten() {
                tx.execute(level_sql(l).delete, [row_id])?;
              }
            }
          }
        }

        tx.commit()?;
        Ok(true)
      })
      .await
      .context("delete", format!("{level} {id}"))
  }

  // ── Labels ────────────────────────────────────────────────────────────────

  async fn create_label(&self, label: NewLabel) -> Result<Id> {
    let NewLabel { code, name, description } = label;
    let name = name.into_inner();
    let at_str = encode_dt(Utc::now());

    let outcome: Checked<Id> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let holder: Option<Id> =
          tx.query_row(schema::LABEL_HOLDER, [code], |r| r.get(0)).optional()?;
        if let Err(e) = rules::unique_label_code(code, holder, None) {
          return Ok(Err(e));
        }
        match tx.execute(
          schema::LABEL_INSERT,
          rusqlite::params![code, name, description, at_str],
        ) {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => {
            return Ok(Err(taxon_core::Error::DuplicateCode(code)));
          }
          Err(e) => return Err(e.into()),
        }
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Ok(id))
      })
      .await
      .context("create", format!("label code {code}"))?;

    Ok(outcome?)
  }

  async fn update_label(&self, id: Id, label: NewLabel) -> Result<()> {
    let NewLabel { code, name, description } = label;
    let name = name.into_inner();

    let outcome: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, schema::LABEL_BY_ID, [id])? {
          return Ok(Err(taxon_core::Error::NotFound { entity: "label", id }));
        }
        let holder: Option<Id> =
          tx.query_row(schema::LABEL_HOLDER, [code], |r| r.get(0)).optional()?;
        if let Err(e) = rules::unique_label_code(code, holder, Some(id)) {
          return Ok(Err(e));
        }
        match tx.execute(
          schema::LABEL_UPDATE,
          rusqlite::params![id, code, name, description],
        ) {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => {
            return Ok(Err(taxon_core::Error::DuplicateCode(code)));
          }
          Err(e) => return Err(e.into()),
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await
      .context("update", format!("label {id}"))?;

    Ok(outcome?)
  }

  async fn delete_label(&self, id: Id) -> Result<bool> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, schema::LABEL_BY_ID, [id])? {
          return Ok(false);
        }
        tx.execute(schema::LINK_DELETE_FOR_LABEL, [id])?;
        tx.execute(schema::LABEL_DELETE, [id])?;
        tx.commit()?;
        Ok(true)
      })
      .await
      .context("delete", format!("label {id}"))
  }

  async fn link_subject_label(&self, subject_id: Id, label_id: Id) -> Result<()> {
    let outcome: Checked<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, level_sql(Level::Subject).exists, [subject_id])? {
          return Ok(Err(taxon_core::Error::not_found(Level::Subject, subject_id)));
        }
        if !row_exists(&tx, schema::LABEL_BY_ID, [label_id])? {
          return Ok(Err(taxon_core::Error::NotFound { entity: "label", id: label_id }));
        }
        let conflict = taxon_core::Error::Conflict { subject_id, label_id };
        if row_exists(&tx, schema::LINK_EXISTS, [subject_id, label_id])? {
          return Ok(Err(conflict));
        }
        match tx.execute(schema::LINK_INSERT, [subject_id, label_id]) {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => return Ok(Err(conflict)),
          Err(e) => return Err(e.into()),
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await
      .context("link", format!("subject {subject_id} to label {label_id}"))?;

    Ok(outcome?)
  }

  async fn unlink_subject_label(&self, subject_id: Id, label_id: Id) -> Result<bool> {
    self
      .conn
      .call(move |conn| Ok(conn.execute(schema::LINK_DELETE, [subject_id, label_id])? > 0))
      .await
      .context("unlink", format!("subject {subject_id} from label {label_id}"))
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_children(&self, level: Level, parent_id: Option<Id>) -> Result<Vec<Node>> {
    rules::validate_children_query(level, parent_id)?;

    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(level_sql(level).children)?;
        let rows = match parent_id {
          Some(p) => stmt
            .query_map([p], |r| Ok(Node { id: r.get(0)?, name: r.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map([], |r| Ok(Node { id: r.get(0)?, name: r.get(1)? }))?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await
      .context("list children", level)
  }

  async fn get_node(&self, level: Level, id: Id) -> Result<Option<TreeNode>> {
    let raw: Option<RawNode> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(level_sql(level).select_one, [id], RawNode::from_row)
          .optional()?)
      })
      .await
      .context("get", format!("{level} {id}"))?;

    raw.map(|r| r.into_node(level)).transpose()
  }

  async fn list_level(&self, level: Level) -> Result<Vec<TreeNode>> {
    let raws: Vec<RawNode> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(level_sql(level).select_all)?;
        let rows = stmt
          .query_map([], RawNode::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .context("list", level)?;

    raws.into_iter().map(|r| r.into_node(level)).collect()
  }

  async fn get_full_hierarchy_for_subject(&self, subject_id: Id) -> Result<SubjectHierarchy> {
    let found: Option<SubjectHierarchy> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(schema::HIERARCHY_FOR_SUBJECT, [subject_id], hierarchy_from_row)
          .optional()?)
      })
      .await
      .context("resolve hierarchy", format!("subject {subject_id}"))?;

    Ok(found.ok_or_else(|| taxon_core::Error::not_found(Level::Subject, subject_id))?)
  }

  async fn get_all_subjects_with_hierarchy(&self) -> Result<Vec<HierarchyRow>> {
    self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(schema::HIERARCHY_ALL)?;
        let rows = stmt
          .query_map([], hierarchy_row_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .context("list hierarchy", Level::Subject)
  }

  async fn get_label(&self, id: Id) -> Result<Option<Label>> {
    let raw: Option<RawLabel> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(schema::LABEL_BY_ID, [id], RawLabel::from_row)
          .optional()?)
      })
      .await
      .context("get", format!("label {id}"))?;

    raw.map(RawLabel::into_label).transpose()
  }

  async fn list_labels(&self) -> Result<Vec<Label>> {
    let raws: Vec<RawLabel> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(schema::LABEL_LIST)?;
        let rows = stmt
          .query_map([], RawLabel::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .context("list", "labels")?;

    raws.into_iter().map(RawLabel::into_label).collect()
  }

  async fn list_links(&self) -> Result<Vec<SubjectLabel>> {
    self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(schema::LINK_LIST)?;
        let rows = stmt
          .query_map([], |r| Ok(SubjectLabel { subject_id: r.get(0)?, label_id: r.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .context("list", "subject labels")
  }
}
