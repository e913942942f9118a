//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "database": { "file": "apicase.duckdb", "schemaVariant": "usersAndCases" }
//! }
//! ```
//! Keys this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::migrations::SchemaVariant;

/// Environment override for the schema variant
pub const SCHEMA_VARIANT_ENV: &str = "APICASE_SCHEMA_VARIANT";

/// Database file used when settings name none
pub const DEFAULT_DB_FILE: &str = "apicase.duckdb";

const SETTINGS_FILE: &str = "settings.json";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    database: DatabaseSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatabaseSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema_variant: Option<SchemaVariant>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Store configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file name, relative to the data directory
    pub db_file: String,
    pub schema_variant: SchemaVariant,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_file: DEFAULT_DB_FILE.to_string(),
            schema_variant: SchemaVariant::default(),
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// The schema variant can be overridden with `APICASE_SCHEMA_VARIANT`.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let env_variant = std::env::var(SCHEMA_VARIANT_ENV).ok();
        Self::load_with_override(data_dir, env_variant.as_deref())
    }

    /// Load config, applying `variant_override` over the file's value
    pub fn load_with_override(data_dir: &Path, variant_override: Option<&str>) -> Result<Self> {
        let raw = read_settings(&data_dir.join(SETTINGS_FILE))?;

        let file_variant = raw.database.schema_variant.unwrap_or_default();
        let schema_variant = match variant_override {
            Some(value) => SchemaVariant::parse(value).unwrap_or_else(|| {
                warn!(value, env = SCHEMA_VARIANT_ENV, "unknown schema variant, using settings");
                file_variant
            }),
            None => file_variant,
        };

        Ok(Self {
            db_file: raw
                .database
                .file
                .clone()
                .unwrap_or_else(|| DEFAULT_DB_FILE.to_string()),
            schema_variant,
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);
        let mut settings = read_settings(&settings_path)?;

        settings.database.file = Some(self.db_file.clone());
        settings.database.schema_variant = Some(self.schema_variant);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Full path of the database file
    pub fn db_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.db_file)
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "unreadable settings, using defaults");
        SettingsFile::default()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_with_override(dir.path(), None).unwrap();
        assert_eq!(config.db_file, DEFAULT_DB_FILE);
        assert_eq!(config.schema_variant, SchemaVariant::UsersAndCases);
        assert_eq!(config.db_path(dir.path()), dir.path().join(DEFAULT_DB_FILE));
    }

    #[test]
    fn test_reads_database_section() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"database": {"file": "accounts.duckdb", "schemaVariant": "users"}}"#,
        )
        .unwrap();

        let config = Config::load_with_override(dir.path(), None).unwrap();
        assert_eq!(config.db_file, "accounts.duckdb");
        assert_eq!(config.schema_variant, SchemaVariant::Users);
    }

    #[test]
    fn test_override_wins_and_bad_override_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"database": {"schemaVariant": "users"}}"#,
        )
        .unwrap();

        let config = Config::load_with_override(dir.path(), Some("users_and_cases")).unwrap();
        assert_eq!(config.schema_variant, SchemaVariant::UsersAndCases);

        let config = Config::load_with_override(dir.path(), Some("bogus")).unwrap();
        assert_eq!(config.schema_variant, SchemaVariant::Users);
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();

        let config = Config::load_with_override(dir.path(), None).unwrap();
        assert_eq!(config.db_file, DEFAULT_DB_FILE);
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{"theme": "dark", "database": {"poolSize": 4}}"#,
        )
        .unwrap();

        let mut config = Config::load_with_override(dir.path(), None).unwrap();
        config.schema_variant = SchemaVariant::Users;
        config.save(dir.path()).unwrap();

        let saved: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["database"]["poolSize"], 4);
        assert_eq!(saved["database"]["schemaVariant"], "users");
        assert_eq!(saved["database"]["file"], DEFAULT_DB_FILE);
    }
}
