// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use media_pipeline_domain::entities::LibraryItem;
use media_pipeline_domain::ports::LibraryItemRepository;
use media_pipeline_domain::value_objects::ids::ServerId;
use media_pipeline_domain::value_objects::media_kind::MediaKind;
use media_pipeline_domain::PipelineError;

use super::error_mapping::{db_err, enum_to_text, text_to_enum};

pub struct SqliteLibraryItemRepository {
    pool: SqlitePool,
}

impl SqliteLibraryItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<LibraryItem, PipelineError> {
        Ok(LibraryItem {
            tmdb_id: row.try_get("tmdb_id").map_err(db_err("read tmdb_id"))?,
            kind: text_to_enum("library_item.kind", row.try_get("kind").map_err(db_err("read kind"))?)?,
            server_id: row.try_get::<String, _>("server_id").map_err(db_err("read server_id"))?.parse()?,
            quality: row.try_get("quality").map_err(db_err("read quality"))?,
            added_at: row.try_get::<DateTime<Utc>, _>("added_at").map_err(db_err("read added_at"))?,
            synced_at: row.try_get::<DateTime<Utc>, _>("synced_at").map_err(db_err("read synced_at"))?,
        })
    }
}

#[async_trait]
impl LibraryItemRepository for SqliteLibraryItemRepository {
    async fn upsert(&self, item: &LibraryItem) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO library_items (tmdb_id, kind, server_id, quality, added_at, synced_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(tmdb_id, kind, server_id) DO UPDATE SET
                quality = excluded.quality, synced_at = excluded.synced_at
            "#,
        )
        .bind(&item.tmdb_id)
        .bind(enum_to_text(&item.kind))
        .bind(item.server_id.to_string())
        .bind(&item.quality)
        .bind(item.added_at)
        .bind(item.synced_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("upsert library item"))?;
        Ok(())
    }

    async fn get(&self, tmdb_id: &str, kind: MediaKind, server_id: ServerId) -> Result<Option<LibraryItem>, PipelineError> {
        let row = sqlx::query("SELECT * FROM library_items WHERE tmdb_id = ? AND kind = ? AND server_id = ?")
            .bind(tmdb_id)
            .bind(enum_to_text(&kind))
            .bind(server_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select library item"))?;
        row.as_ref().map(Self::from_row).transpose()
    }
}
