//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use duckdb::types::Value;
use duckdb::{params_from_iter, Connection, Row};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{normalize_email, time, Case, CaseUpdate, NewCase, NewUser, User, UserUpdate};
use crate::migrations::SchemaVariant;
use crate::ports::Repository;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const USER_COLUMNS: &str = "id, name, email, photo, verified, password, role, \
     created_at::VARCHAR, updated_at::VARCHAR";

const CASE_COLUMNS: &str = "id, user_id, title, host, uri, method, request_body, \
     expected_result, category, response_code, response_body, used, \
     created_at::VARCHAR, updated_at::VARCHAR";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Map an engine error onto the constraint it reports, if any
pub(crate) fn classify_error(err: duckdb::Error) -> Error {
    let msg = err.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("foreign key") {
        Error::ForeignKeyViolation(msg)
    } else if lower.contains("not null") {
        Error::NotNullViolation(msg)
    } else if lower.contains("duplicate key")
        || lower.contains("unique constraint")
        || lower.contains("primary key constraint")
    {
        Error::UniqueViolation(msg)
    } else {
        Error::Database(msg)
    }
}

fn parse_id(column: &str, raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::database(format!("invalid {column} '{raw}': {e}")))
}

fn parse_timestamp(column: &str, raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    time::from_sql(raw).ok_or_else(|| Error::database(format!("invalid {column} '{raw}'")))
}

/// `users` row as read, before id/timestamp parsing
struct UserRow {
    id: String,
    name: String,
    email: String,
    photo: String,
    verified: bool,
    password: String,
    role: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            photo: row.get(3)?,
            verified: row.get(4)?,
            password: row.get(5)?,
            role: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id("users.id", &self.id)?,
            name: self.name,
            email: self.email,
            photo: self.photo,
            verified: self.verified,
            password: self.password,
            role: self.role,
            created_at: parse_timestamp("users.created_at", &self.created_at)?,
            updated_at: parse_timestamp("users.updated_at", &self.updated_at)?,
        })
    }
}

/// `cases` row as read, before id/timestamp parsing
struct CaseRow {
    id: String,
    user_id: String,
    title: String,
    host: String,
    uri: String,
    method: Option<String>,
    request_body: Option<String>,
    expected_result: Option<String>,
    category: Option<String>,
    response_code: Option<String>,
    response_body: Option<String>,
    used: bool,
    created_at: String,
    updated_at: String,
}

impl CaseRow {
    fn from_row(row: &Row) -> duckdb::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            host: row.get(3)?,
            uri: row.get(4)?,
            method: row.get(5)?,
            request_body: row.get(6)?,
            expected_result: row.get(7)?,
            category: row.get(8)?,
            response_code: row.get(9)?,
            response_body: row.get(10)?,
            used: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn into_case(self) -> Result<Case> {
        Ok(Case {
            id: parse_id("cases.id", &self.id)?,
            user_id: parse_id("cases.user_id", &self.user_id)?,
            title: self.title,
            host: self.host,
            uri: self.uri,
            method: self.method,
            request_body: self.request_body,
            expected_result: self.expected_result,
            category: self.category,
            response_code: self.response_code,
            response_body: self.response_body,
            used: self.used,
            created_at: parse_timestamp("cases.created_at", &self.created_at)?,
            updated_at: parse_timestamp("cases.updated_at", &self.updated_at)?,
        })
    }
}

/// Column/value pairs for a dynamically built INSERT or UPDATE
#[derive(Default)]
struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Assignments {
    fn push(&mut self, column: &'static str, value: Value) {
        self.columns.push(column);
        self.values.push(value);
    }

    fn push_text(&mut self, column: &'static str, value: Option<&str>) {
        if let Some(v) = value {
            self.push(column, Value::Text(v.to_string()));
        }
    }

    fn push_bool(&mut self, column: &'static str, value: Option<bool>) {
        if let Some(v) = value {
            self.push(column, Value::Boolean(v));
        }
    }

    fn insert_sql(&self, table: &str) -> String {
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            self.columns.join(", ")
        )
    }

    fn update_sql(&self, table: &str) -> String {
        let sets: Vec<String> = self.columns.iter().map(|c| format!("{c} = ?")).collect();
        format!("UPDATE {table} SET {} WHERE id = ?", sets.join(", "))
    }
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
    variant: SchemaVariant,
}

impl DuckDbRepository {
    /// Open (or create) the database file at `db_path`
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which can occur when another process holds the file.
    pub fn new(db_path: &Path, variant: SchemaVariant) -> anyhow::Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    debug!(path = %db_path.display(), ?variant, "opened database");
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                        variant,
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max_retries = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// Open a private in-memory database
    pub fn open_in_memory(variant: SchemaVariant) -> anyhow::Result<Self> {
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_in_memory_with_flags(config)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
            variant,
        })
    }

    fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
        // Extension autoloading stays off; nothing here needs ICU or httpfs
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Install any schema files of the configured variant not yet applied
    pub fn run_migrations(&self) -> anyhow::Result<MigrationResult> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let migration_service = MigrationService::new(&conn);
        migration_service.run_pending(self.variant)
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> anyhow::Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn variant(&self) -> SchemaVariant {
        self.variant
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Whether the file holds a `cases` table, whatever variant it was opened with
    fn cases_installed(conn: &Connection) -> Result<bool> {
        Ok(MigrationService::new(conn).table_exists("cases")?)
    }

    fn require_cases(&self) -> Result<()> {
        let conn = self.lock()?;
        if Self::cases_installed(&conn)? {
            Ok(())
        } else {
            Err(Error::config("cases table is not installed in this database"))
        }
    }

    fn count_cases(conn: &Connection, user_id: Uuid) -> Result<usize> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM cases WHERE user_id = ?",
                [user_id.to_string()],
                |row| row.get(0),
            )
            .map_err(classify_error)?;
        Ok(count as usize)
    }

    /// Run a raw statement, returning the affected row count
    ///
    /// Bypasses validation and id generation; constraint failures still map
    /// to the matching error variant.
    pub fn execute_raw(&self, sql: &str) -> Result<usize> {
        let conn = self.lock()?;
        conn.execute(sql, []).map_err(classify_error)
    }

    fn fetch_user(conn: &Connection, filter: &str, value: String) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = ?");
        let mut stmt = conn.prepare(&sql).map_err(classify_error)?;
        match stmt.query_row([value], UserRow::from_row) {
            Ok(row) => row.into_user().map(Some),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(classify_error(e)),
        }
    }

    fn fetch_case(conn: &Connection, id: Uuid) -> Result<Option<Case>> {
        let sql = format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = ?");
        let mut stmt = conn.prepare(&sql).map_err(classify_error)?;
        match stmt.query_row([id.to_string()], CaseRow::from_row) {
            Ok(row) => row.into_case().map(Some),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(classify_error(e)),
        }
    }

    fn delete_by_id(&self, table: &str, id: Uuid) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?"), [id.to_string()])
            .map_err(classify_error)?;
        if deleted == 0 {
            return Err(Error::not_found(format!("{table} row {id}")));
        }
        debug!(table, %id, "deleted row");
        Ok(())
    }
}

impl Repository for DuckDbRepository {
    fn insert_user(&self, user: &NewUser) -> Result<User> {
        user.validate()?;

        let id = Uuid::new_v4();
        let now = time::to_sql(&time::now());

        let mut row = Assignments::default();
        row.push("id", Value::Text(id.to_string()));
        row.push("name", Value::Text(user.name.clone()));
        row.push("email", Value::Text(user.normalized_email()));
        row.push("password", Value::Text(user.password.clone()));
        row.push_text("photo", user.photo.as_deref());
        row.push_bool("verified", user.verified);
        row.push_text("role", user.role.as_deref());
        row.push("created_at", Value::Text(now.clone()));
        row.push("updated_at", Value::Text(now));

        let sql = row.insert_sql("users");
        let conn = self.lock()?;
        conn.execute(&sql, params_from_iter(row.values))
            .map_err(classify_error)?;
        debug!(%id, "inserted user");

        Self::fetch_user(&conn, "id", id.to_string())?
            .ok_or_else(|| Error::database(format!("user {id} missing after insert")))
    }

    fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.lock()?;
        Self::fetch_user(&conn, "id", id.to_string())
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        Self::fetch_user(&conn, "email", normalize_email(email))
    }

    fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<User> {
        update.validate()?;

        let conn = self.lock()?;
        let current = Self::fetch_user(&conn, "id", id.to_string())?
            .ok_or_else(|| Error::not_found(format!("user {id}")))?;
        if update.is_empty() {
            return Ok(current);
        }

        // An unchanged email is left out: writing the indexed column makes the
        // engine delete and reinsert the row
        let email = update
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|email| *email != current.email);
        if email.is_some()
            && Self::cases_installed(&conn)?
            && Self::count_cases(&conn, id)? > 0
        {
            return Err(Error::ForeignKeyViolation(format!(
                "email of user {id} cannot change while the user owns cases"
            )));
        }

        let mut set = Assignments::default();
        set.push_text("name", update.name.as_deref());
        set.push_text("email", email.as_deref());
        set.push_text("photo", update.photo.as_deref());
        set.push_bool("verified", update.verified);
        set.push_text("password", update.password.as_deref());
        set.push_text("role", update.role.as_deref());
        set.push(
            "updated_at",
            Value::Text(time::to_sql(&time::advance(&current.updated_at))),
        );

        let sql = set.update_sql("users");
        let mut values = set.values;
        values.push(Value::Text(id.to_string()));
        conn.execute(&sql, params_from_iter(values))
            .map_err(classify_error)?;
        debug!(%id, "updated user");

        Self::fetch_user(&conn, "id", id.to_string())?
            .ok_or_else(|| Error::not_found(format!("user {id}")))
    }

    fn delete_user(&self, id: Uuid) -> Result<()> {
        self.delete_by_id("users", id)
    }

    fn insert_case(&self, case: &NewCase) -> Result<Case> {
        self.require_cases()?;
        case.validate()?;

        let id = Uuid::new_v4();
        let now = time::to_sql(&time::now());

        let mut row = Assignments::default();
        row.push("id", Value::Text(id.to_string()));
        row.push("user_id", Value::Text(case.user_id.to_string()));
        row.push("title", Value::Text(case.title.clone()));
        row.push("host", Value::Text(case.host.clone()));
        row.push("uri", Value::Text(case.uri.clone()));
        row.push_text("method", case.method.as_deref());
        row.push_text("request_body", case.request_body.as_deref());
        row.push_text("expected_result", case.expected_result.as_deref());
        row.push_text("category", case.category.as_deref());
        row.push_text("response_code", case.response_code.as_deref());
        row.push_text("response_body", case.response_body.as_deref());
        row.push_bool("used", case.used);
        row.push("created_at", Value::Text(now.clone()));
        row.push("updated_at", Value::Text(now));

        let sql = row.insert_sql("cases");
        let conn = self.lock()?;
        conn.execute(&sql, params_from_iter(row.values))
            .map_err(classify_error)?;
        debug!(%id, user_id = %case.user_id, "inserted case");

        Self::fetch_case(&conn, id)?
            .ok_or_else(|| Error::database(format!("case {id} missing after insert")))
    }

    fn get_case(&self, id: Uuid) -> Result<Option<Case>> {
        self.require_cases()?;
        let conn = self.lock()?;
        Self::fetch_case(&conn, id)
    }

    fn update_case(&self, id: Uuid, update: &CaseUpdate) -> Result<Case> {
        self.require_cases()?;
        update.validate()?;

        let conn = self.lock()?;
        let current =
            Self::fetch_case(&conn, id)?.ok_or_else(|| Error::not_found(format!("case {id}")))?;
        if update.is_empty() {
            return Ok(current);
        }

        let mut set = Assignments::default();
        if let Some(user_id) = update.user_id {
            set.push("user_id", Value::Text(user_id.to_string()));
        }
        set.push_text("title", update.title.as_deref());
        set.push_text("host", update.host.as_deref());
        set.push_text("uri", update.uri.as_deref());
        set.push_text("method", update.method.as_deref());
        set.push_text("request_body", update.request_body.as_deref());
        set.push_text("expected_result", update.expected_result.as_deref());
        set.push_text("category", update.category.as_deref());
        set.push_text("response_code", update.response_code.as_deref());
        set.push_text("response_body", update.response_body.as_deref());
        set.push_bool("used", update.used);
        set.push(
            "updated_at",
            Value::Text(time::to_sql(&time::advance(&current.updated_at))),
        );

        let sql = set.update_sql("cases");
        let mut values = set.values;
        values.push(Value::Text(id.to_string()));
        conn.execute(&sql, params_from_iter(values))
            .map_err(classify_error)?;
        debug!(%id, "updated case");

        Self::fetch_case(&conn, id)?.ok_or_else(|| Error::not_found(format!("case {id}")))
    }

    fn delete_case(&self, id: Uuid) -> Result<()> {
        self.require_cases()?;
        self.delete_by_id("cases", id)
    }

    fn count_cases_for_user(&self, user_id: Uuid) -> Result<usize> {
        self.require_cases()?;
        let conn = self.lock()?;
        Self::count_cases(&conn, user_id)
    }
}
