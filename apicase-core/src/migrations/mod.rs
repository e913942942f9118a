//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary at build time using include_str!.
//! Each migration is a tuple of (name, sql_content), applied in order.

use serde::{Deserialize, Serialize};

/// All migrations, embedded at compile time.
/// Format: (filename, sql_content)
///
/// IMPORTANT: When adding a new migration:
/// 1. Create the SQL file: NNN_description.sql
/// 2. Add an entry here in order
/// 3. Decide which `SchemaVariant` includes it
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_users.sql", include_str!("001_users.sql")),
    ("002_cases.sql", include_str!("002_cases.sql")),
];

/// Name of the bookkeeping migration that every variant bootstraps first
pub const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";

/// Which tables get installed
///
/// `Users` is the first schema file on its own; `UsersAndCases` adds the
/// `cases` table with its foreign key to `users`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaVariant {
    Users,
    #[default]
    UsersAndCases,
}

impl SchemaVariant {
    /// Migrations belonging to this variant, in application order
    pub fn migrations(self) -> &'static [(&'static str, &'static str)] {
        match self {
            SchemaVariant::Users => &MIGRATIONS[..2],
            SchemaVariant::UsersAndCases => MIGRATIONS,
        }
    }

    /// Whether the `cases` table is part of this variant
    pub fn has_cases(self) -> bool {
        matches!(self, SchemaVariant::UsersAndCases)
    }

    /// Parse the loose spellings accepted from the environment
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "users" | "users_only" | "v1" => Some(SchemaVariant::Users),
            "users_and_cases" | "usersandcases" | "cases" | "full" | "v2" => {
                Some(SchemaVariant::UsersAndCases)
            }
            _ => None,
        }
    }
}
