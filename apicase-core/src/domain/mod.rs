//! Core domain entities
//!
//! Entities are pure data structures with validation logic - no I/O.

mod case;
pub mod result;
pub mod time;
mod user;

pub use case::{Case, CaseUpdate, NewCase};
pub use user::{NewUser, User, UserUpdate, DEFAULT_PHOTO, DEFAULT_ROLE};
pub(crate) use user::normalize_email;

use result::{Error, Result};

/// Reject `value` when it holds more than `max` characters
///
/// The engine accepts `VARCHAR(n)` without enforcing `n`, so bounded columns
/// are checked here. Counts characters, not bytes.
pub(crate) fn check_length(column: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(Error::validation(format!(
            "{column} is {len} characters, limit is {max}"
        )));
    }
    Ok(())
}

/// Reject an empty or whitespace-only value for a required column
pub(crate) fn check_required(column: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!("{column} must not be empty")));
    }
    Ok(())
}

/// Same as [`check_required`] for fields an update may leave unset
pub(crate) fn check_required_opt(column: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(v) => check_required(column, v),
        None => Ok(()),
    }
}

/// Same as [`check_length`] for optional columns
pub(crate) fn check_length_opt(column: &str, value: Option<&str>, max: usize) -> Result<()> {
    match value {
        Some(v) => check_length(column, v, max),
        None => Ok(()),
    }
}
