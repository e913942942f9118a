//! Migration service - installs the embedded schema
//!
//! Schema files are SQL embedded at compile time. Each one is tracked in the
//! sys_migrations table so installation is idempotent.

use anyhow::Result;
use duckdb::{params, Connection};
use tracing::{debug, info};

use crate::domain::time;
use crate::migrations::{SchemaVariant, BOOTSTRAP_MIGRATION};

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

/// Service for installing the schema on a connection
pub struct MigrationService<'a> {
    conn: &'a Connection,
}

impl<'a> MigrationService<'a> {
    /// Create a new migration service with a database connection
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Run all pending migrations of `variant`
    ///
    /// 1. Ensures the sys_migrations table exists (bootstrap)
    /// 2. Gets list of already applied migrations
    /// 3. Applies any pending migrations of the variant in order
    /// 4. Records each applied migration
    pub fn run_pending(&self, variant: SchemaVariant) -> Result<MigrationResult> {
        let mut newly_applied = Vec::new();

        let bootstrap_ran = if !self.migrations_table_exists()? {
            if let Some((name, sql)) = variant
                .migrations()
                .iter()
                .find(|(n, _)| *n == BOOTSTRAP_MIGRATION)
            {
                self.conn.execute_batch(sql)?;
                self.record_migration(name)?;
                info!(migration = %name, "bootstrapped migrations table");
                newly_applied.push(name.to_string());
                true
            } else {
                false
            }
        } else {
            false
        };

        let applied_set = self.get_applied()?;
        let already_applied = if bootstrap_ran {
            applied_set.len().saturating_sub(1)
        } else {
            applied_set.len()
        };

        for (name, sql) in variant.migrations() {
            if *name == BOOTSTRAP_MIGRATION {
                continue;
            }
            if applied_set.iter().any(|applied| applied == name) {
                debug!(migration = %name, "already applied");
                continue;
            }
            self.conn.execute_batch(sql)?;
            self.record_migration(name)?;
            info!(migration = %name, "applied migration");
            newly_applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied: newly_applied,
            already_applied,
        })
    }

    /// Check if sys_migrations table exists
    fn migrations_table_exists(&self) -> Result<bool> {
        self.table_exists("sys_migrations")
    }

    /// Check whether a table is present in the catalog
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let result: std::result::Result<i64, _> = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
            [table],
            |row| row.get(0),
        );

        match result {
            Ok(count) => Ok(count > 0),
            Err(_) => Ok(false),
        }
    }

    /// Get list of already applied migration names
    pub fn get_applied(&self) -> Result<Vec<String>> {
        if !self.migrations_table_exists()? {
            return Ok(Vec::new());
        }
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut result = Vec::new();
        for name in names {
            result.push(name?);
        }
        Ok(result)
    }

    /// Get list of pending migration names for `variant`
    pub fn get_pending(&self, variant: SchemaVariant) -> Result<Vec<String>> {
        let applied = self.get_applied()?;
        let pending = variant
            .migrations()
            .iter()
            .filter(|(name, _)| !applied.iter().any(|a| a == name))
            .map(|(name, _)| name.to_string())
            .collect();
        Ok(pending)
    }

    /// Record a migration as applied
    fn record_migration(&self, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sys_migrations (migration_name, applied_at) VALUES (?, ?)",
            params![name, time::to_sql(&time::now())],
        )?;
        Ok(())
    }
}
