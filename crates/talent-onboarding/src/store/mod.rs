//! SQLite pool construction and schema bootstrap shared by every repository.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
pub use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::error::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid database url '{url}': {source}")]
    InvalidUrl { url: String, source: sqlx::Error },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Error enumeration for repository failures, shared by every sqlx-backed store.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    /// The parent row exists but the named section was never written.
    #[error("no {0} row to update")]
    MissingSection(&'static str),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(value: sqlx::Error) -> Self {
        match &value {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Conflict(db.message().to_string())
            }
            _ => Self::Unavailable(value.to_string()),
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(detail) => {
                warn!(detail = %detail, "unmapped uniqueness conflict");
                ServiceError::conflict("Record already exists")
            }
            RepositoryError::NotFound => ServiceError::not_found("record not found"),
            RepositoryError::MissingSection(section) => {
                ServiceError::validation(format!("No {section} to update"))
            }
            RepositoryError::Unavailable(detail) => ServiceError::infra(detail),
        }
    }
}

/// Open a pool against `config.url`, creating the database file when missing.
///
/// In-memory URLs are pinned to a single connection that never recycles, otherwise each
/// pooled connection would see its own empty database.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|source| StoreError::InvalidUrl {
            url: config.url.clone(),
            source,
        })?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = if config.url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?
    };

    Ok(pool)
}

/// Fresh in-memory database with the full schema applied.
pub async fn memory() -> Result<SqlitePool, StoreError> {
    let pool = connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await?;
    bootstrap(&pool).await?;
    Ok(pool)
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        email TEXT NOT NULL UNIQUE,
        email_verified INTEGER NOT NULL DEFAULT 0,
        verification_code TEXT,
        verification_expiry TEXT,
        password_hash TEXT,
        full_name TEXT,
        username TEXT,
        phone_number TEXT UNIQUE,
        position TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS admins (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        full_name TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'admin',
        is_active INTEGER NOT NULL DEFAULT 1,
        last_login TEXT,
        deleted INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS applicants (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL CHECK (kind IN ('model', 'hostess')),
        user_id INTEGER NOT NULL REFERENCES users(id),
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        whatsapp TEXT NOT NULL,
        date_of_birth TEXT NOT NULL,
        gender TEXT NOT NULL CHECK (gender IN ('Female', 'Male', 'Other')),
        nationality TEXT NOT NULL,
        street TEXT NOT NULL,
        city TEXT NOT NULL,
        residence_country TEXT NOT NULL,
        emergency_contact_name TEXT,
        emergency_contact_relationship TEXT,
        emergency_contact_phone TEXT,
        registration_step INTEGER NOT NULL DEFAULT 1 CHECK (registration_step BETWEEN 1 AND 4),
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'under_review', 'approved', 'rejected')),
        deleted INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (kind, username)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_applicants_owner
    ON applicants (kind, user_id, deleted)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS applicant_measurements (
        id TEXT PRIMARY KEY,
        applicant_id TEXT NOT NULL UNIQUE REFERENCES applicants(id) ON DELETE CASCADE,
        experience TEXT NOT NULL,
        height INTEGER NOT NULL,
        weight INTEGER NOT NULL,
        waist INTEGER,
        hips INTEGER,
        hair_color TEXT,
        eye_color TEXT,
        languages TEXT NOT NULL DEFAULT '[]',
        skills TEXT NOT NULL DEFAULT '[]',
        availability TEXT,
        preferred_events TEXT NOT NULL DEFAULT '[]',
        previous_work TEXT,
        reference_contact TEXT,
        social_instagram TEXT,
        social_facebook TEXT,
        social_twitter TEXT,
        social_linkedin TEXT,
        photo TEXT,
        additional_photos TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS applicant_documents (
        id TEXT PRIMARY KEY,
        applicant_id TEXT NOT NULL UNIQUE REFERENCES applicants(id) ON DELETE CASCADE,
        issuer_country TEXT NOT NULL,
        document_type TEXT NOT NULL
            CHECK (document_type IN ('National ID Card', 'Passport', 'Driver''s License')),
        document_front TEXT NOT NULL,
        document_back TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS applicant_identity_checks (
        id TEXT PRIMARY KEY,
        applicant_id TEXT NOT NULL UNIQUE REFERENCES applicants(id) ON DELETE CASCADE,
        selfie_with_id TEXT NOT NULL,
        verified INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    )
    "#,
];

/// Create every table and index when absent. Safe to run on each start.
pub async fn bootstrap(pool: &SqlitePool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    info!(tables = 6, "database schema ready");
    Ok(())
}
