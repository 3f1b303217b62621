//! Database module for PostgreSQL persistence.
//!
//! Bootstrap makes sure the configured database and the `staff_member` table
//! exist before anything is served. Running it against a provisioned server is
//! a no-op.

#[cfg(test)]
mod memory;
mod repository;

#[cfg(test)]
pub use memory::MemoryStore;
pub use repository::*;

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{ConnectOptions, Connection};

use crate::config::Config;
use crate::errors::{AppError, AppResult};

/// SQLSTATE raised when `CREATE DATABASE` loses a race with another creator.
const DUPLICATE_DATABASE: &str = "42P04";

/// Longest identifier PostgreSQL keeps without truncating.
const MAX_IDENTIFIER_LEN: usize = 63;

/// Ensure the database exists, connect the pool and create the schema.
pub async fn init_database(config: &Config) -> AppResult<PgPool> {
    let options = PgConnectOptions::from_str(&config.dsn)
        .map_err(|e| AppError::Config(format!("invalid DSN: {}", e)))?;

    ensure_database_exists(&options, &config.database_name).await?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options.database(&config.database_name))
        .await?;
    tracing::info!("Connected to database {}", config.database_name);

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Create the database named `name` unless the server already has it.
async fn ensure_database_exists(options: &PgConnectOptions, name: &str) -> AppResult<()> {
    validate_database_name(name)?;

    let mut conn = options.connect().await?;

    let exists = sqlx::query("SELECT 1 FROM pg_database WHERE datname = $1")
        .bind(name)
        .fetch_optional(&mut conn)
        .await?
        .is_some();

    if exists {
        tracing::debug!("Database {} already exists", name);
    } else {
        // Identifiers cannot be bound as parameters; the name was validated above.
        let statement = format!("CREATE DATABASE \"{}\"", name);
        match sqlx::query(&statement).execute(&mut conn).await {
            Ok(_) => tracing::info!("Database {} created", name),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(DUPLICATE_DATABASE) => {
                tracing::debug!("Database {} was created concurrently", name);
            }
            Err(e) => return Err(e.into()),
        }
    }

    conn.close().await?;
    Ok(())
}

/// Reject anything that is not a plain SQL identifier.
fn validate_database_name(name: &str) -> AppResult<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "invalid database name {:?}: use letters, digits and underscores",
            name
        )))
    }
}

/// Create the schema if it does not exist.
async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS staff_member (
            staff_id     TEXT PRIMARY KEY CHECK (staff_id <> ''),
            first_name   TEXT NOT NULL,
            last_name    TEXT NOT NULL,
            email        TEXT NOT NULL UNIQUE,
            phone_number TEXT NOT NULL UNIQUE,
            title        TEXT NOT NULL DEFAULT '',
            office       TEXT NOT NULL DEFAULT '',
            created_at   TIMESTAMPTZ NOT NULL DEFAULT current_timestamp,
            updated_at   TIMESTAMPTZ NOT NULL DEFAULT current_timestamp,
            CHECK (created_at <= updated_at)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::debug!("Database schema initialized");
    Ok(())
}
