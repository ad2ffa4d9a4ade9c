//! `taxon` binary.
//!
//! Reads `taxon.toml` (or the path given with `--config`) layered under
//! `TAXON_*` environment variables, opens the SQLite store, and runs one
//! subcommand:
//!
//! ```text
//! taxon migrate [--drop-legacy]   apply the schema; optionally drop `temas`
//! taxon serve                     serve the JSON API under /api
//! taxon tree <subject-id>         print a subject's chain and labels
//! ```

mod settings;

use std::{
  io::{self, BufRead as _, Write as _},
  path::PathBuf,
  sync::Arc,
  time::Duration,
};

use anyhow::Context as _;
use axum::Router;
use clap::{Parser, Subcommand};
use taxon_api::AppState;
use taxon_core::{Id, Level, store::TaxonomyStore as _};
use taxon_store_sqlite::{LEGACY_TABLE, SqliteStore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

#[derive(Parser)]
#[command(author, version, about = "Taxon classification tree")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "taxon.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Create the schema if needed.
  Migrate {
    /// Also remove the pre-normalisation `temas` table, after confirmation.
    #[arg(long)]
    drop_legacy: bool,
  },
  /// Serve the JSON API.
  Serve,
  /// Print the five-level chain of a subject.
  Tree {
    subject_id: Id,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to load settings from {:?}", cli.config))?;

  // Opening the store applies the schema; it is idempotent.
  let store = SqliteStore::connect(&settings.database_url)
    .await
    .with_context(|| format!("failed to open store at {}", settings.database_url))?;

  match cli.command {
    Command::Migrate { drop_legacy } => migrate(&store, drop_legacy).await,
    Command::Serve => serve(store, &settings).await,
    Command::Tree { subject_id } => tree(&store, subject_id).await,
  }
}

// ─── migrate ─────────────────────────────────────────────────────────────────

async fn migrate(store: &SqliteStore, drop_legacy: bool) -> anyhow::Result<()> {
  let version = store.schema_version().await.context("failed to read schema version")?;
  tracing::info!(version, "schema is up to date");

  if !drop_legacy {
    return Ok(());
  }

  if !store.legacy_table_exists().await? {
    println!("No `{LEGACY_TABLE}` table found; nothing to drop.");
    return Ok(());
  }

  let answer = prompt(&format!(
    "Drop the legacy `{LEGACY_TABLE}` table? Its rows are not migrated. [s/N] "
  ))?;
  if is_yes(&answer) {
    store.drop_legacy_table().await.context("failed to drop legacy table")?;
    tracing::info!(table = LEGACY_TABLE, "legacy table dropped");
  } else {
    println!("Kept `{LEGACY_TABLE}`.");
  }
  Ok(())
}

/// Print `question` and read one line from stdin.
fn prompt(question: &str) -> anyhow::Result<String> {
  print!("{question}");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim().to_string())
}

/// Accepts Portuguese and English affirmatives, case-insensitively.
fn is_yes(answer: &str) -> bool {
  matches!(answer.to_lowercase().as_str(), "s" | "sim" | "y" | "yes")
}

// ─── serve ───────────────────────────────────────────────────────────────────

async fn serve(store: SqliteStore, settings: &Settings) -> anyhow::Result<()> {
  let state = AppState::new(Arc::new(store), Duration::from_secs(settings.cache_ttl_secs));
  let app = Router::new().nest("/api", taxon_api::api_router(state));
  let address = settings.address();

  tracing::info!("Listening on http://{address}/api");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

// ─── tree ────────────────────────────────────────────────────────────────────

async fn tree(store: &SqliteStore, subject_id: Id) -> anyhow::Result<()> {
  let hierarchy = store
    .get_full_hierarchy_for_subject(subject_id)
    .await
    .with_context(|| format!("failed to resolve subject {subject_id}"))?;

  for (depth, (level, name)) in Level::ALL.iter().zip(hierarchy.path()).enumerate() {
    println!("{:indent$}{}: {name}", "", level.title(), indent = depth * 2);
  }

  let labels: Vec<String> = store
    .get_all_subjects_with_hierarchy()
    .await?
    .into_iter()
    .filter(|row| row.hierarchy.subject_id == subject_id)
    .filter_map(|row| row.label)
    .collect();
  if labels.is_empty() {
    println!("(no labels)");
  } else {
    for label in labels {
      println!("- {label}");
    }
  }
  Ok(())
}
