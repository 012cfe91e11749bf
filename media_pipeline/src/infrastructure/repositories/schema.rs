// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite schema helpers shared by every repository adapter.

use sqlx::migrate::MigrateDatabase;
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Runs pending migrations against the provided pool. Idempotent — sqlx
/// tracks applied versions in its own bookkeeping table.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("applying pending migrations");
    sqlx::migrate!("../migrations").run(pool).await?;
    info!("database schema up to date");
    Ok(())
}

/// Creates the SQLite file if it doesn't exist yet; `SqlitePool::connect`
/// otherwise fails outright for a missing file.
pub async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    if !sqlx::Sqlite::database_exists(database_url).await? {
        debug!(url = %database_url, "creating database file");
        sqlx::Sqlite::create_database(database_url).await?;
    }
    Ok(())
}

/// Connects, creating the file and applying migrations first. What every
/// `main.rs` entrypoint (`serve`, `migrate`) actually calls.
pub async fn initialize_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    create_database_if_missing(database_url).await?;
    let pool = SqlitePool::connect(database_url).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn initialize_database_creates_every_table() {
        let temp = NamedTempFile::new().unwrap();
        let db_url = format!("sqlite://{}", temp.path().to_str().unwrap());
        drop(temp);

        let pool = initialize_database(&db_url).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='processing_items'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let temp = NamedTempFile::new().unwrap();
        let db_url = format!("sqlite://{}", temp.path().to_str().unwrap());
        drop(temp);

        create_database_if_missing(&db_url).await.unwrap();
        let pool = SqlitePool::connect(&db_url).await.unwrap();
        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();
    }
}
