// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use media_pipeline_domain::entities::Download;
use media_pipeline_domain::ports::DownloadRepository;
use media_pipeline_domain::value_objects::ids::{DownloadId, RequestId};
use media_pipeline_domain::PipelineError;

use super::error_mapping::{db_err, enum_to_text, text_to_enum};

pub struct SqliteDownloadRepository {
    pool: SqlitePool,
}

impl SqliteDownloadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Download, PipelineError> {
        Ok(Download {
            id: row.try_get::<String, _>("id").map_err(db_err("read id"))?.parse()?,
            request_id: row.try_get::<String, _>("request_id").map_err(db_err("read request_id"))?.parse()?,
            torrent_hash: row.try_get("torrent_hash").map_err(db_err("read torrent_hash"))?,
            parsed_title: row.try_get("parsed_title").map_err(db_err("read parsed_title"))?,
            parsed_year: row.try_get::<Option<i64>, _>("parsed_year").map_err(db_err("read parsed_year"))?.map(|v| v as u16),
            parsed_season: row.try_get::<Option<i64>, _>("parsed_season").map_err(db_err("read parsed_season"))?.map(|v| v as u32),
            state: text_to_enum("download.state", row.try_get("state").map_err(db_err("read state"))?)?,
            percent_complete: row.try_get::<i64, _>("percent_complete").map_err(db_err("read percent_complete"))? as u8,
            content_path: row.try_get("content_path").map_err(db_err("read content_path"))?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(db_err("read created_at"))?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(db_err("read updated_at"))?,
        })
    }
}

#[async_trait]
impl DownloadRepository for SqliteDownloadRepository {
    async fn save(&self, download: &Download) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO downloads (id, request_id, torrent_hash, parsed_title, parsed_year, parsed_season, state, percent_complete, content_path, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                state = excluded.state, percent_complete = excluded.percent_complete, content_path = excluded.content_path,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(download.id.to_string())
        .bind(download.request_id.to_string())
        .bind(&download.torrent_hash)
        .bind(&download.parsed_title)
        .bind(download.parsed_year.map(|v| v as i64))
        .bind(download.parsed_season.map(|v| v as i64))
        .bind(enum_to_text(&download.state))
        .bind(download.percent_complete as i64)
        .bind(&download.content_path)
        .bind(download.created_at)
        .bind(download.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert download"))?;
        Ok(())
    }

    async fn get(&self, id: DownloadId) -> Result<Download, PipelineError> {
        let row = sqlx::query("SELECT * FROM downloads WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select download"))?
            .ok_or_else(|| PipelineError::not_found(format!("download {id}")))?;
        Self::from_row(&row)
    }

    async fn get_by_hash(&self, torrent_hash: &str) -> Result<Option<Download>, PipelineError> {
        let row = sqlx::query("SELECT * FROM downloads WHERE torrent_hash = ?")
            .bind(torrent_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select download by hash"))?;
        row.as_ref().map(Self::from_row).transpose()
    }

    async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<Download>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM downloads WHERE request_id = ?")
            .bind(request_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select downloads by request"))?;
        rows.iter().map(Self::from_row).collect()
    }
}
