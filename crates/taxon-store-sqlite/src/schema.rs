//! SQL schema and statements for the Taxon SQLite store.
//!
//! Executed once at connection startup. Every statement the store runs is a
//! `&'static str` defined here; values are always bound as parameters.

use taxon_core::Level;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS macro_theme (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL     -- RFC 3339 UTC; store-assigned
);

CREATE TABLE IF NOT EXISTS area (
    id             INTEGER PRIMARY KEY,
    name           TEXT NOT NULL,
    macro_theme_id INTEGER NOT NULL REFERENCES macro_theme(id) ON DELETE CASCADE,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subarea (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    area_id     INTEGER NOT NULL REFERENCES area(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS discipline (
    id          INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    subarea_id  INTEGER NOT NULL REFERENCES subarea(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subject (
    id            INTEGER PRIMARY KEY,
    name          TEXT NOT NULL,
    discipline_id INTEGER NOT NULL REFERENCES discipline(id) ON DELETE CASCADE,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS label (
    id          INTEGER PRIMARY KEY,
    code        INTEGER NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    description TEXT,             -- NULL when absent, never ''
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subject_label (
    subject_id  INTEGER NOT NULL REFERENCES subject(id) ON DELETE CASCADE,
    label_id    INTEGER NOT NULL REFERENCES label(id)   ON DELETE CASCADE,
    PRIMARY KEY (subject_id, label_id)
);

CREATE INDEX IF NOT EXISTS area_macro_theme_idx   ON area(macro_theme_id);
CREATE INDEX IF NOT EXISTS subarea_area_idx       ON subarea(area_id);
CREATE INDEX IF NOT EXISTS discipline_subarea_idx ON discipline(subarea_id);
CREATE INDEX IF NOT EXISTS subject_discipline_idx ON subject(discipline_id);
CREATE INDEX IF NOT EXISTS subject_label_subj_idx ON subject_label(subject_id);
CREATE INDEX IF NOT EXISTS subject_label_lbl_idx  ON subject_label(label_id);

PRAGMA user_version = 1;
";

/// The flat table that predates the normalised tree.
pub const LEGACY_TABLE: &str = "temas";

pub const LEGACY_EXISTS: &str =
  "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1";

pub const LEGACY_DROP: &str = "DROP TABLE IF EXISTS temas";

// ─── Per-level statements ────────────────────────────────────────────────────

/// The statements for one tree level. Every `SELECT` of whole rows yields
/// `(id, name, parent_id, created_at)`; `parent_id` is `NULL` for the root.
pub struct LevelSql {
  pub exists:     &'static str,
  pub select_one: &'static str,
  pub select_all: &'static str,
  /// `?1` = parent id; unused by the root, which lists every row.
  pub children:   &'static str,
  /// Root: `(?1 name, ?2 created_at)`. Others: `(?1 name, ?2 parent, ?3 created_at)`.
  pub insert:     &'static str,
  /// Root: `(?1 id, ?2 name)`. Others: `(?1 id, ?2 name, ?3 parent)`.
  pub update:     &'static str,
  pub delete:     &'static str,
  /// Ids of the rows whose parent is `?1`.
  pub child_ids:  Option<&'static str>,
}

// `ORDER BY name` uses SQLite's BINARY collation: names compare by UTF-8
// bytes, so uppercase sorts before lowercase and accented initials after `z`.
const MACRO_THEME: LevelSql = LevelSql {
  exists:     "SELECT 1 FROM macro_theme WHERE id = ?1",
  select_one: "SELECT id, name, NULL, created_at FROM macro_theme WHERE id = ?1",
  select_all: "SELECT id, name, NULL, created_at FROM macro_theme ORDER BY name, id",
  children:   "SELECT id, name FROM macro_theme ORDER BY name, id",
  insert:     "INSERT INTO macro_theme (name, created_at) VALUES (?1, ?2)",
  update:     "UPDATE macro_theme SET name = ?2 WHERE id = ?1",
  delete:     "DELETE FROM macro_theme WHERE id = ?1",
  child_ids:  Some("SELECT id FROM area WHERE macro_theme_id = ?1"),
};

const AREA: LevelSql = LevelSql {
  exists:     "SELECT 1 FROM area WHERE id = ?1",
  select_one: "SELECT id, name, macro_theme_id, created_at FROM area WHERE id = ?1",
  select_all: "SELECT id, name, macro_theme_id, created_at FROM area ORDER BY name, id",
  children:   "SELECT id, name FROM area WHERE macro_theme_id = ?1 ORDER BY name, id",
  insert:     "INSERT INTO area (name, macro_theme_id, created_at) VALUES (?1, ?2, ?3)",
  update:     "UPDATE area SET name = ?2, macro_theme_id = ?3 WHERE id = ?1",
  delete:     "DELETE FROM area WHERE id = ?1",
  child_ids:  Some("SELECT id FROM subarea WHERE area_id = ?1"),
};

const SUBAREA: LevelSql = LevelSql {
  exists:     "SELECT 1 FROM subarea WHERE id = ?1",
  select_one: "SELECT id, name, area_id, created_at FROM subarea WHERE id = ?1",
  select_all: "SELECT id, name, area_id, created_at FROM subarea ORDER BY name, id",
  children:   "SELECT id, name FROM subarea WHERE area_id = ?1 ORDER BY name, id",
  insert:     "INSERT INTO subarea (name, area_id, created_at) VALUES (?1, ?2, ?3)",
  update:     "UPDATE subarea SET name = ?2, area_id = ?3 WHERE id = ?1",
  delete:     "DELETE FROM subarea WHERE id = ?1",
  child_ids:  Some("SELECT id FROM discipline WHERE subarea_id = ?1"),
};

const DISCIPLINE: LevelSql = LevelSql {
  exists:     "SELECT 1 FROM discipline WHERE id = ?1",
  select_one: "SELECT id, name, subarea_id, created_at FROM discipline WHERE id = ?1",
  select_all: "SELECT id, name, subarea_id, created_at FROM discipline ORDER BY name, id",
  children:   "SELECT id, name FROM discipline WHERE subarea_id = ?1 ORDER BY name, id",
  insert:     "INSERT INTO discipline (name, subarea_id, created_at) VALUES (?1, ?2, ?3)",
  update:     "UPDATE discipline SET name = ?2, subarea_id = ?3 WHERE id = ?1",
  delete:     "DELETE FROM discipline WHERE id = ?1",
  child_ids:  Some("SELECT id FROM subject WHERE discipline_id = ?1"),
};

const SUBJECT: LevelSql = LevelSql {
  exists:     "SELECT 1 FROM subject WHERE id = ?1",
  select_one: "SELECT id, name, discipline_id, created_at FROM subject WHERE id = ?1",
  select_all: "SELECT id, name, discipline_id, created_at FROM subject ORDER BY name, id",
  children:   "SELECT id, name FROM subject WHERE discipline_id = ?1 ORDER BY name, id",
  insert:     "INSERT INTO subject (name, discipline_id, created_at) VALUES (?1, ?2, ?3)",
  update:     "UPDATE subject SET name = ?2, discipline_id = ?3 WHERE id = ?1",
  delete:     "DELETE FROM subject WHERE id = ?1",
  child_ids:  None,
};

pub fn level_sql(level: Level) -> &'static LevelSql {
  match level {
    Level::MacroTheme => &MACRO_THEME,
    Level::Area => &AREA,
    Level::SubArea => &SUBAREA,
    Level::Discipline => &DISCIPLINE,
    Level::Subject => &SUBJECT,
  }
}

// ─── Labels and links ────────────────────────────────────────────────────────

pub const LABEL_BY_ID: &str =
  "SELECT id, code, name, description, created_at FROM label WHERE id = ?1";

pub const LABEL_LIST: &str =
  "SELECT id, code, name, description, created_at FROM label ORDER BY code";

pub const LABEL_HOLDER: &str = "SELECT id FROM label WHERE code = ?1";

pub const LABEL_INSERT: &str =
  "INSERT INTO label (code, name, description, created_at) VALUES (?1, ?2, ?3, ?4)";

pub const LABEL_UPDATE: &str =
  "UPDATE label SET code = ?2, name = ?3, description = ?4 WHERE id = ?1";

pub const LABEL_DELETE: &str = "DELETE FROM label WHERE id = ?1";

pub const LINK_EXISTS: &str =
  "SELECT 1 FROM subject_label WHERE subject_id = ?1 AND label_id = ?2";

pub const LINK_INSERT: &str = "INSERT INTO subject_label (subject_id, label_id) VALUES (?1, ?2)";

pub const LINK_DELETE: &str = "DELETE FROM subject_label WHERE subject_id = ?1 AND label_id = ?2";

pub const LINK_DELETE_FOR_SUBJECT: &str = "DELETE FROM subject_label WHERE subject_id = ?1";

pub const LINK_DELETE_FOR_LABEL: &str = "DELETE FROM subject_label WHERE label_id = ?1";

pub const LINK_LIST: &str =
  "SELECT subject_id, label_id FROM subject_label ORDER BY subject_id, label_id";

// ─── Hierarchy joins ─────────────────────────────────────────────────────────

pub const HIERARCHY_FOR_SUBJECT: &str = "
SELECT s.id, mt.name, a.name, sa.name, d.name, s.name
FROM subject s
JOIN discipline  d  ON s.discipline_id  = d.id
JOIN subarea     sa ON d.subarea_id     = sa.id
JOIN area        a  ON sa.area_id       = a.id
JOIN macro_theme mt ON a.macro_theme_id = mt.id
WHERE s.id = ?1";

pub const HIERARCHY_ALL: &str = "
SELECT s.id, mt.name, a.name, sa.name, d.name, s.name, l.code, l.name
FROM subject s
JOIN discipline  d  ON s.discipline_id  = d.id
JOIN subarea     sa ON d.subarea_id     = sa.id
JOIN area        a  ON sa.area_id       = a.id
JOIN macro_theme mt ON a.macro_theme_id = mt.id
LEFT JOIN subject_label sl ON sl.subject_id = s.id
LEFT JOIN label         l  ON l.id          = sl.label_id
ORDER BY mt.name, a.name, sa.name, d.name, s.name, s.id, l.code";
