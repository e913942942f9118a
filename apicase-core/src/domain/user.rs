//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::Result;
use super::{check_length, check_length_opt, check_required, check_required_opt};

/// Value the `photo` column takes when none is supplied
pub const DEFAULT_PHOTO: &str = "default.png";

/// Value the `role` column takes when none is supplied
pub const DEFAULT_ROLE: &str = "user";

pub(crate) const NAME_MAX: usize = 100;
pub(crate) const EMAIL_MAX: usize = 255;
pub(crate) const PHOTO_MAX: usize = 255;
pub(crate) const PASSWORD_MAX: usize = 100;
pub(crate) const ROLE_MAX: usize = 50;

/// A registered account as stored in `users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub photo: String,
    pub verified: bool,
    /// Stored as supplied; expected to be a hash already
    pub password: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new `users` row
///
/// Unset optionals are left out of the INSERT so the column defaults apply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub photo: Option<String>,
    pub verified: Option<bool>,
    pub role: Option<String>,
}

impl NewUser {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    /// Email as it will be stored
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }

    pub fn validate(&self) -> Result<()> {
        let email = self.normalized_email();
        check_required("name", &self.name)?;
        check_required("email", &email)?;
        check_required("password", &self.password)?;
        check_length("name", &self.name, NAME_MAX)?;
        check_length("email", &email, EMAIL_MAX)?;
        check_length("password", &self.password, PASSWORD_MAX)?;
        check_length_opt("photo", self.photo.as_deref(), PHOTO_MAX)?;
        check_length_opt("role", self.role.as_deref(), ROLE_MAX)?;
        Ok(())
    }
}

/// Changes to an existing user; `None` leaves the column as it is
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub verified: Option<bool>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl UserUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn photo(mut self, photo: impl Into<String>) -> Self {
        self.photo = Some(photo.into());
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.photo.is_none()
            && self.verified.is_none()
            && self.password.is_none()
            && self.role.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        let email = self.email.as_deref().map(normalize_email);
        check_required_opt("name", self.name.as_deref())?;
        check_required_opt("email", email.as_deref())?;
        check_required_opt("password", self.password.as_deref())?;
        check_length_opt("name", self.name.as_deref(), NAME_MAX)?;
        check_length_opt("email", email.as_deref(), EMAIL_MAX)?;
        check_length_opt("photo", self.photo.as_deref(), PHOTO_MAX)?;
        check_length_opt("password", self.password.as_deref(), PASSWORD_MAX)?;
        check_length_opt("role", self.role.as_deref(), ROLE_MAX)?;
        Ok(())
    }
}

/// Trimmed, lowercased email
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_leaves_defaults_unset() {
        let user = NewUser::new("Ada", "ada@example.com", "$argon2id$hash");
        assert!(user.photo.is_none());
        assert!(user.verified.is_none());
        assert!(user.role.is_none());
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_email_normalized() {
        let user = NewUser::new("Ada", "  Ada@Example.COM ", "pw");
        assert_eq!(user.normalized_email(), "ada@example.com");
    }

    #[test]
    fn test_new_user_length_limits() {
        let long_name = "n".repeat(NAME_MAX + 1);
        assert!(NewUser::new(long_name, "a@b.c", "pw").validate().is_err());

        let long_role = "r".repeat(ROLE_MAX + 1);
        let err = NewUser::new("Ada", "a@b.c", "pw")
            .with_role(long_role)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("role"));

        let exact = "p".repeat(PASSWORD_MAX);
        assert!(NewUser::new("Ada", "a@b.c", exact).validate().is_ok());
    }

    #[test]
    fn test_new_user_required_fields() {
        for (name, email, password, column) in [
            ("", "a@b.c", "pw", "name"),
            ("Ada", "   ", "pw", "email"),
            ("Ada", "a@b.c", "", "password"),
        ] {
            let err = NewUser::new(name, email, password).validate().unwrap_err();
            assert!(
                err.to_string().contains(&format!("{column} must not be empty")),
                "unexpected error for {column}: {err}"
            );
        }
    }

    #[test]
    fn test_user_update_rejects_blank_required() {
        assert!(UserUpdate::default().email(" ").validate().is_err());
        assert!(UserUpdate::default().name("").validate().is_err());
        assert!(UserUpdate::default().password("").validate().is_err());
        // Optional columns may be set to anything within limits
        assert!(UserUpdate::default().photo("").validate().is_ok());
    }

    #[test]
    fn test_user_update_builder() {
        assert!(UserUpdate::default().is_empty());

        let update = UserUpdate::default().name("Grace").verified(true);
        assert!(!update.is_empty());
        assert_eq!(update.name.as_deref(), Some("Grace"));
        assert_eq!(update.verified, Some(true));
        assert!(update.validate().is_ok());

        let bad = UserUpdate::default().photo("x".repeat(PHOTO_MAX + 1));
        assert!(bad.validate().is_err());
    }
}
