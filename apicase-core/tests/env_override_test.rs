//! Schema variant chosen through the environment
//!
//! Kept in its own test binary: it sets a process-wide variable.
//!
//! Run with: cargo test --test env_override_test -- --nocapture

use tempfile::TempDir;

use apicase_core::config::{Config, SCHEMA_VARIANT_ENV};
use apicase_core::{ApicaseContext, Error, NewCase, NewUser, Repository, SchemaVariant};

#[test]
fn test_env_variable_overrides_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("settings.json"),
        r#"{"database": {"schemaVariant": "usersAndCases"}}"#,
    )
    .unwrap();

    std::env::set_var(SCHEMA_VARIANT_ENV, "users");
    let config = Config::load(temp_dir.path());
    let ctx = ApicaseContext::new(temp_dir.path());
    std::env::remove_var(SCHEMA_VARIANT_ENV);

    assert_eq!(config.unwrap().schema_variant, SchemaVariant::Users);

    let ctx = ctx.unwrap();
    assert_eq!(ctx.config.schema_variant, SchemaVariant::Users);
    assert_eq!(ctx.repository.variant(), SchemaVariant::Users);

    let user = ctx
        .repository
        .insert_user(&NewUser::new("Ada", "ada@example.com", "hash"))
        .unwrap();
    let err = ctx
        .repository
        .insert_case(&NewCase::new(user.id, "t", "http://h", "/"))
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}
