//! Service layer
//!
//! Services coordinate domain logic and port interactions.

pub mod migration;

pub use migration::{MigrationResult, MigrationService};
