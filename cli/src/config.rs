//! Configuration management for the CLI.

use shelfkeep_engine::{Compression, SourceCatalog};
use std::env;
use std::path::PathBuf;

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON file holding the library
    pub store_path: PathBuf,
    /// Directory for generated backups
    pub backup_dir: PathBuf,
    /// How many generated backups to keep
    pub max_backups: usize,
    /// Gzip level for new backups
    pub compression: Compression,
    /// Source display names written into backups
    pub sources: SourceCatalog,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_path = lookup("SHELFKEEP_STORE")
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingStorePath)?;

        let backup_dir = lookup("SHELFKEEP_BACKUP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./backups"));

        let max_backups = lookup("SHELFKEEP_MAX_BACKUPS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidMaxBackups)?;

        let level: u32 = lookup("SHELFKEEP_COMPRESSION")
            .unwrap_or_else(|| "6".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidCompression)?;
        let compression = Compression::new(level).map_err(|_| ConfigError::InvalidCompression)?;

        let sources = match lookup("SHELFKEEP_SOURCES") {
            Some(raw) => parse_sources(&raw)?,
            None => SourceCatalog::new(),
        };

        Ok(Self {
            store_path,
            backup_dir,
            max_backups,
            compression,
            sources,
        })
    }
}

/// Parse `id=name,id=name` into a source catalog.
fn parse_sources(raw: &str) -> Result<SourceCatalog, ConfigError> {
    let mut catalog = SourceCatalog::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id, name) = entry
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidSources(entry.to_string()))?;
        let id = id
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidSources(entry.to_string()))?;
        catalog.insert(id, name.trim());
    }
    Ok(catalog)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SHELFKEEP_STORE environment variable is required")]
    MissingStorePath,

    #[error("Invalid SHELFKEEP_MAX_BACKUPS value")]
    InvalidMaxBackups,

    #[error("Invalid SHELFKEEP_COMPRESSION value (expected 0-9)")]
    InvalidCompression,

    #[error("Invalid SHELFKEEP_SOURCES entry: {0}")]
    InvalidSources(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[("SHELFKEEP_STORE", "lib.json")])).unwrap();
        assert_eq!(config.store_path, PathBuf::from("lib.json"));
        assert_eq!(config.backup_dir, PathBuf::from("./backups"));
        assert_eq!(config.max_backups, 5);
        assert_eq!(config.compression, Compression::default());
    }

    #[test]
    fn store_path_required() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::MissingStorePath)
        ));
    }

    #[test]
    fn rejects_bad_numbers() {
        let result = Config::from_lookup(lookup(&[
            ("SHELFKEEP_STORE", "lib.json"),
            ("SHELFKEEP_COMPRESSION", "12"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidCompression)));

        let result = Config::from_lookup(lookup(&[
            ("SHELFKEEP_STORE", "lib.json"),
            ("SHELFKEEP_MAX_BACKUPS", "-1"),
        ]));
        assert!(matches!(result, Err(ConfigError::InvalidMaxBackups)));
    }

    #[test]
    fn parses_source_catalog() {
        let config = Config::from_lookup(lookup(&[
            ("SHELFKEEP_STORE", "lib.json"),
            ("SHELFKEEP_SOURCES", "1=Local, 42 = Remote Shelf"),
        ]))
        .unwrap();
        assert_eq!(config.sources.name(1), "Local");
        assert_eq!(config.sources.name(42), "Remote Shelf");
        assert_eq!(config.sources.name(7), "");

        assert!(matches!(
            parse_sources("oops"),
            Err(ConfigError::InvalidSources(_))
        ));
    }
}
