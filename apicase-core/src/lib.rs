//! Apicase Core - users and their HTTP test cases on DuckDB
//!
//! The crate follows a hexagonal layout:
//!
//! - **domain**: Entities (User, Case), validation, error types
//! - **ports**: The `Repository` trait
//! - **services**: Schema installation
//! - **adapters**: DuckDB implementation of the repository
//! - **migrations**: Embedded schema files

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use adapters::duckdb::DuckDbRepository;
use config::Config;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{Case, CaseUpdate, NewCase, NewUser, User, UserUpdate};
pub use migrations::SchemaVariant;
pub use ports::Repository;

/// Entry point: configuration plus an opened, schema-ready repository
pub struct ApicaseContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
}

impl ApicaseContext {
    /// Open the store described by `data_dir/settings.json`
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        Self::with_config(data_dir, config)
    }

    /// Open the store with an explicit configuration
    pub fn with_config(data_dir: &Path, config: Config) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = config.db_path(data_dir);
        let repository = Arc::new(DuckDbRepository::new(&db_path, config.schema_variant)?);

        let result = repository.run_migrations()?;
        info!(
            path = %db_path.display(),
            applied = result.applied.len(),
            already_applied = result.already_applied,
            "schema ready"
        );

        Ok(Self { config, repository })
    }
}
