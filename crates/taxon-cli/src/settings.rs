//! Runtime settings, layered from an optional TOML file and `TAXON_*`
//! environment variables (environment wins).

use std::path::Path;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
  /// `sqlite://<path>`, a bare path, or `:memory:`.
  #[serde(default = "default_database_url")]
  pub database_url:   String,
  #[serde(default = "default_host")]
  pub host:           String,
  #[serde(default = "default_port")]
  pub port:           u16,
  /// Lifetime of a cached report, in seconds.
  #[serde(default = "default_cache_ttl_secs")]
  pub cache_ttl_secs: u64,
}

fn default_database_url() -> String { "taxon.db".to_string() }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_cache_ttl_secs() -> u64 { 60 }

impl Settings {
  /// Read `path` (if it exists) and then the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("TAXON").try_parsing(true))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn from_toml(toml: &str) -> Settings {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn missing_keys_take_defaults() {
    let settings = from_toml("");
    assert_eq!(settings.database_url, "taxon.db");
    assert_eq!(settings.address(), "127.0.0.1:8080");
    assert_eq!(settings.cache_ttl_secs, 60);
  }

  #[test]
  fn file_values_override_defaults() {
    let settings = from_toml(
      r#"
        database_url = "sqlite:///var/lib/taxon/taxon.db"
        port = 9000
      "#,
    );
    assert_eq!(settings.database_url, "sqlite:///var/lib/taxon/taxon.db");
    assert_eq!(settings.port, 9000);
    assert_eq!(settings.host, "127.0.0.1");
  }

  #[test]
  fn absent_file_is_not_an_error() {
    let settings = Settings::load(Path::new("does-not-exist.toml")).unwrap();
    assert_eq!(settings.cache_ttl_secs, 60);
  }
}
