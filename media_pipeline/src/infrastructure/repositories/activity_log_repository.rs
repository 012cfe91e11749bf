// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{Row, SqlitePool};

use media_pipeline_domain::entities::ActivityLogEntry;
use media_pipeline_domain::ports::ActivityLogRepository;
use media_pipeline_domain::value_objects::ids::RequestId;
use media_pipeline_domain::PipelineError;

use super::error_mapping::{db_err, text_to_enum};

pub struct SqliteActivityLogRepository {
    pool: SqlitePool,
}

impl SqliteActivityLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ActivityLogEntry, PipelineError> {
        let metadata_raw: String = row.try_get("metadata").map_err(db_err("read metadata"))?;
        let metadata: Value = serde_json::from_str(&metadata_raw).map_err(|e| PipelineError::Serialization(format!("activity_log.metadata: {e}")))?;
        Ok(ActivityLogEntry {
            id: row.try_get::<String, _>("id").map_err(db_err("read id"))?.parse()?,
            request_id: row.try_get::<String, _>("request_id").map_err(db_err("read request_id"))?.parse()?,
            severity: text_to_enum("activity_log.severity", row.try_get("severity").map_err(db_err("read severity"))?)?,
            event: row.try_get("event").map_err(db_err("read event"))?,
            message: row.try_get("message").map_err(db_err("read message"))?,
            metadata,
            recorded_at: row.try_get::<DateTime<Utc>, _>("recorded_at").map_err(db_err("read recorded_at"))?,
        })
    }
}

#[async_trait]
impl ActivityLogRepository for SqliteActivityLogRepository {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (id, request_id, severity, event, message, metadata, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.request_id.to_string())
        .bind(super::error_mapping::enum_to_text(&entry.severity))
        .bind(&entry.event)
        .bind(&entry.message)
        .bind(entry.metadata.to_string())
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert activity log entry"))?;
        Ok(())
    }

    async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<ActivityLogEntry>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM activity_log WHERE request_id = ? ORDER BY recorded_at ASC")
            .bind(request_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select activity log by request"))?;
        rows.iter().map(Self::from_row).collect()
    }
}
