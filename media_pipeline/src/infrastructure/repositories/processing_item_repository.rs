// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use media_pipeline_domain::context::ProcessingContext;
use media_pipeline_domain::entities::ProcessingItem;
use media_pipeline_domain::ports::ProcessingItemRepository;
use media_pipeline_domain::value_objects::ids::{ProcessingItemId, RequestId};
use media_pipeline_domain::value_objects::processing_status::ProcessingStatus;
use media_pipeline_domain::PipelineError;

use super::error_mapping::{db_err, enum_to_text, text_to_enum};

pub struct SqliteProcessingItemRepository {
    pool: SqlitePool,
}

impl SqliteProcessingItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ProcessingItem, PipelineError> {
        let download_id: Option<String> = row.try_get("download_id").map_err(db_err("read download_id"))?;
        let encoding_job_id: Option<String> = row.try_get("encoding_job_id").map_err(db_err("read encoding_job_id"))?;
        Ok(ProcessingItem {
            id: row.try_get::<String, _>("id").map_err(db_err("read id"))?.parse()?,
            request_id: row.try_get::<String, _>("request_id").map_err(db_err("read request_id"))?.parse()?,
            kind: text_to_enum("item.kind", row.try_get("kind").map_err(db_err("read kind"))?)?,
            season: row.try_get::<Option<i64>, _>("season").map_err(db_err("read season"))?.map(|v| v as u32),
            episode: row.try_get::<Option<i64>, _>("episode").map_err(db_err("read episode"))?.map(|v| v as u32),
            status: text_to_enum("item.status", row.try_get("status").map_err(db_err("read status"))?)?,
            attempts: row.try_get::<i64, _>("attempts").map_err(db_err("read attempts"))? as u32,
            max_attempts: row.try_get::<i64, _>("max_attempts").map_err(db_err("read max_attempts"))? as u32,
            current_step: row.try_get("current_step").map_err(db_err("read current_step"))?,
            last_error: row.try_get("last_error").map_err(db_err("read last_error"))?,
            next_retry_at: row.try_get::<Option<DateTime<Utc>>, _>("next_retry_at").map_err(db_err("read next_retry_at"))?,
            skip_until: row.try_get::<Option<DateTime<Utc>>, _>("skip_until").map_err(db_err("read skip_until"))?,
            progress: row.try_get::<i64, _>("progress").map_err(db_err("read progress"))? as u8,
            download_id: download_id.map(|v| v.parse()).transpose()?,
            encoding_job_id: encoding_job_id.map(|v| v.parse()).transpose()?,
            source_file_path: row.try_get("source_file_path").map_err(db_err("read source_file_path"))?,
            step_context: ProcessingContext::from_blob(&row.try_get::<String, _>("step_context").map_err(db_err("read step_context"))?)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(db_err("read created_at"))?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(db_err("read updated_at"))?,
        })
    }
}

#[async_trait]
impl ProcessingItemRepository for SqliteProcessingItemRepository {
    async fn save(&self, item: &ProcessingItem) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO processing_items (id, request_id, kind, season, episode, status, attempts, max_attempts, current_step, last_error, next_retry_at, skip_until, progress, download_id, encoding_job_id, source_file_path, step_context, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status, attempts = excluded.attempts, current_step = excluded.current_step,
                last_error = excluded.last_error, next_retry_at = excluded.next_retry_at, skip_until = excluded.skip_until,
                progress = excluded.progress, download_id = excluded.download_id, encoding_job_id = excluded.encoding_job_id,
                source_file_path = excluded.source_file_path, step_context = excluded.step_context, updated_at = excluded.updated_at
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.request_id.to_string())
        .bind(enum_to_text(&item.kind))
        .bind(item.season.map(|v| v as i64))
        .bind(item.episode.map(|v| v as i64))
        .bind(enum_to_text(&item.status))
        .bind(item.attempts as i64)
        .bind(item.max_attempts as i64)
        .bind(&item.current_step)
        .bind(&item.last_error)
        .bind(item.next_retry_at)
        .bind(item.skip_until)
        .bind(item.progress as i64)
        .bind(item.download_id.map(|v| v.to_string()))
        .bind(item.encoding_job_id.map(|v| v.to_string()))
        .bind(&item.source_file_path)
        .bind(item.step_context.to_blob()?)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert processing item"))?;
        Ok(())
    }

    async fn get(&self, id: ProcessingItemId) -> Result<ProcessingItem, PipelineError> {
        let row = sqlx::query("SELECT * FROM processing_items WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select processing item"))?
            .ok_or_else(|| PipelineError::not_found(format!("processing item {id}")))?;
        Self::from_row(&row)
    }

    async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<ProcessingItem>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM processing_items WHERE request_id = ?")
            .bind(request_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select items by request"))?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn list_by_status(&self, status: ProcessingStatus) -> Result<Vec<ProcessingItem>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM processing_items WHERE status = ?")
            .bind(enum_to_text(&status))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select items by status"))?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn list_by_request_and_season(&self, request_id: RequestId, season: u32) -> Result<Vec<ProcessingItem>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM processing_items WHERE request_id = ? AND season = ?")
            .bind(request_id.to_string())
            .bind(season as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select items by request and season"))?;
        rows.iter().map(Self::from_row).collect()
    }
}
