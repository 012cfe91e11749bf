// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use media_pipeline_domain::entities::RemoteEncoder;
use media_pipeline_domain::ports::RemoteEncoderRepository;
use media_pipeline_domain::value_objects::ids::EncoderId;
use media_pipeline_domain::PipelineError;

use super::error_mapping::{db_err, enum_to_text, text_to_enum};

pub struct SqliteRemoteEncoderRepository {
    pool: SqlitePool,
}

impl SqliteRemoteEncoderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RemoteEncoder, PipelineError> {
        Ok(RemoteEncoder {
            encoder_id: row.try_get::<String, _>("encoder_id").map_err(db_err("read encoder_id"))?.parse()?,
            gpu_device: row.try_get("gpu_device").map_err(db_err("read gpu_device"))?,
            max_concurrent: row.try_get::<i64, _>("max_concurrent").map_err(db_err("read max_concurrent"))? as u32,
            current_jobs: row.try_get::<i64, _>("current_jobs").map_err(db_err("read current_jobs"))? as u32,
            status: text_to_enum("encoder.status", row.try_get("status").map_err(db_err("read status"))?)?,
            hostname: row.try_get("hostname").map_err(db_err("read hostname"))?,
            version: row.try_get("version").map_err(db_err("read version"))?,
            total_completed: row.try_get::<i64, _>("total_completed").map_err(db_err("read total_completed"))? as u64,
            total_failed: row.try_get::<i64, _>("total_failed").map_err(db_err("read total_failed"))? as u64,
            last_heartbeat: row.try_get::<DateTime<Utc>, _>("last_heartbeat").map_err(db_err("read last_heartbeat"))?,
        })
    }
}

#[async_trait]
impl RemoteEncoderRepository for SqliteRemoteEncoderRepository {
    async fn save(&self, encoder: &RemoteEncoder) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO remote_encoders (encoder_id, gpu_device, max_concurrent, current_jobs, status, hostname, version, total_completed, total_failed, last_heartbeat)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(encoder_id) DO UPDATE SET
                gpu_device = excluded.gpu_device, max_concurrent = excluded.max_concurrent, current_jobs = excluded.current_jobs,
                status = excluded.status, hostname = excluded.hostname, version = excluded.version,
                total_completed = excluded.total_completed, total_failed = excluded.total_failed, last_heartbeat = excluded.last_heartbeat
            "#,
        )
        .bind(encoder.encoder_id.to_string())
        .bind(&encoder.gpu_device)
        .bind(encoder.max_concurrent as i64)
        .bind(encoder.current_jobs as i64)
        .bind(enum_to_text(&encoder.status))
        .bind(&encoder.hostname)
        .bind(&encoder.version)
        .bind(encoder.total_completed as i64)
        .bind(encoder.total_failed as i64)
        .bind(encoder.last_heartbeat)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert remote encoder"))?;
        Ok(())
    }

    async fn get(&self, id: EncoderId) -> Result<RemoteEncoder, PipelineError> {
        let row = sqlx::query("SELECT * FROM remote_encoders WHERE encoder_id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select remote encoder"))?
            .ok_or_else(|| PipelineError::not_found(format!("remote encoder {id}")))?;
        Self::from_row(&row)
    }

    async fn list_all(&self) -> Result<Vec<RemoteEncoder>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM remote_encoders")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select all remote encoders"))?;
        rows.iter().map(Self::from_row).collect()
    }
}
