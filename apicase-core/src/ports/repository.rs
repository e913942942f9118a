//! Repository port - database abstraction

use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Case, CaseUpdate, NewCase, NewUser, User, UserUpdate};

/// Storage for users and cases
///
/// Implementations generate ids, keep `updated_at` current and surface
/// engine constraint failures as the matching `Error` variant.
pub trait Repository: Send + Sync {
    // === Users ===

    /// Insert a user under a freshly generated id and return the stored row
    fn insert_user(&self, user: &NewUser) -> Result<User>;

    fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Look up by email (normalized the same way as on insert)
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Apply `update` and advance `updated_at`
    fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<User>;

    /// Delete a user; rejected while any case still references it
    fn delete_user(&self, id: Uuid) -> Result<()>;

    // === Cases ===

    fn insert_case(&self, case: &NewCase) -> Result<Case>;

    fn get_case(&self, id: Uuid) -> Result<Option<Case>>;

    fn update_case(&self, id: Uuid, update: &CaseUpdate) -> Result<Case>;

    fn delete_case(&self, id: Uuid) -> Result<()>;

    /// Number of cases owned by `user_id`
    fn count_cases_for_user(&self, user_id: Uuid) -> Result<usize>;
}
