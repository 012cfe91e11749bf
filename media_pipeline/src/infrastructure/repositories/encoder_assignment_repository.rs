// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use media_pipeline_domain::entities::EncoderAssignment;
use media_pipeline_domain::ports::EncoderAssignmentRepository;
use media_pipeline_domain::value_objects::assignment_status::AssignmentStatus;
use media_pipeline_domain::value_objects::ids::{EncoderAssignmentId, EncoderId, ProcessingItemId};
use media_pipeline_domain::PipelineError;

use super::error_mapping::{db_err, enum_to_text, text_to_enum};

pub struct SqliteEncoderAssignmentRepository {
    pool: SqlitePool,
}

impl SqliteEncoderAssignmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<EncoderAssignment, PipelineError> {
        let encoder_id: Option<String> = row.try_get("encoder_id").map_err(db_err("read encoder_id"))?;
        Ok(EncoderAssignment {
            id: row.try_get::<String, _>("id").map_err(db_err("read id"))?.parse()?,
            job_id: row.try_get::<String, _>("job_id").map_err(db_err("read job_id"))?.parse()?,
            encoder_id: encoder_id.map(|v| v.parse()).transpose()?,
            input_path: row.try_get("input_path").map_err(db_err("read input_path"))?,
            output_path: row.try_get("output_path").map_err(db_err("read output_path"))?,
            profile_id: row.try_get("profile_id").map_err(db_err("read profile_id"))?,
            status: text_to_enum("assignment.status", row.try_get("status").map_err(db_err("read status"))?)?,
            attempt: row.try_get::<i64, _>("attempt").map_err(db_err("read attempt"))? as u32,
            max_attempts: row.try_get::<i64, _>("max_attempts").map_err(db_err("read max_attempts"))? as u32,
            progress: row.try_get::<i64, _>("progress").map_err(db_err("read progress"))? as u8,
            fps: row.try_get("fps").map_err(db_err("read fps"))?,
            speed: row.try_get("speed").map_err(db_err("read speed"))?,
            eta: row.try_get::<Option<i64>, _>("eta").map_err(db_err("read eta"))?.map(|v| v as u64),
            output_size: row.try_get::<Option<i64>, _>("output_size").map_err(db_err("read output_size"))?.map(|v| v as u64),
            compression_ratio: row.try_get("compression_ratio").map_err(db_err("read compression_ratio"))?,
            encode_duration: row.try_get::<Option<i64>, _>("encode_duration").map_err(db_err("read encode_duration"))?.map(|v| v as u64),
            error: row.try_get("error").map_err(db_err("read error"))?,
            assigned_at: row.try_get::<Option<DateTime<Utc>>, _>("assigned_at").map_err(db_err("read assigned_at"))?,
            started_at: row.try_get::<Option<DateTime<Utc>>, _>("started_at").map_err(db_err("read started_at"))?,
            completed_at: row.try_get::<Option<DateTime<Utc>>, _>("completed_at").map_err(db_err("read completed_at"))?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(db_err("read created_at"))?,
        })
    }
}

#[async_trait]
impl EncoderAssignmentRepository for SqliteEncoderAssignmentRepository {
    async fn save(&self, assignment: &EncoderAssignment) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO encoder_assignments (id, job_id, encoder_id, input_path, output_path, profile_id, status, attempt, max_attempts, progress, fps, speed, eta, output_size, compression_ratio, encode_duration, error, assigned_at, started_at, completed_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                encoder_id = excluded.encoder_id, status = excluded.status, attempt = excluded.attempt,
                progress = excluded.progress, fps = excluded.fps, speed = excluded.speed, eta = excluded.eta,
                output_size = excluded.output_size, compression_ratio = excluded.compression_ratio,
                encode_duration = excluded.encode_duration, error = excluded.error, assigned_at = excluded.assigned_at,
                started_at = excluded.started_at, completed_at = excluded.completed_at
            "#,
        )
        .bind(assignment.id.to_string())
        .bind(assignment.job_id.to_string())
        .bind(assignment.encoder_id.map(|v| v.to_string()))
        .bind(&assignment.input_path)
        .bind(&assignment.output_path)
        .bind(&assignment.profile_id)
        .bind(enum_to_text(&assignment.status))
        .bind(assignment.attempt as i64)
        .bind(assignment.max_attempts as i64)
        .bind(assignment.progress as i64)
        .bind(assignment.fps)
        .bind(assignment.speed)
        .bind(assignment.eta.map(|v| v as i64))
        .bind(assignment.output_size.map(|v| v as i64))
        .bind(assignment.compression_ratio)
        .bind(assignment.encode_duration.map(|v| v as i64))
        .bind(&assignment.error)
        .bind(assignment.assigned_at)
        .bind(assignment.started_at)
        .bind(assignment.completed_at)
        .bind(assignment.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert encoder assignment"))?;
        Ok(())
    }

    async fn get(&self, id: EncoderAssignmentId) -> Result<EncoderAssignment, PipelineError> {
        let row = sqlx::query("SELECT * FROM encoder_assignments WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select encoder assignment"))?
            .ok_or_else(|| PipelineError::not_found(format!("encoder assignment {id}")))?;
        Self::from_row(&row)
    }

    async fn get_by_job_id(&self, job_id: ProcessingItemId) -> Result<Option<EncoderAssignment>, PipelineError> {
        let row = sqlx::query("SELECT * FROM encoder_assignments WHERE job_id = ? ORDER BY created_at DESC LIMIT 1")
            .bind(job_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select encoder assignment by job"))?;
        row.as_ref().map(Self::from_row).transpose()
    }

    async fn find_active_by_input_path(&self, input_path: &str) -> Result<Option<EncoderAssignment>, PipelineError> {
        let row = sqlx::query("SELECT * FROM encoder_assignments WHERE input_path = ? AND status IN ('pending', 'encoding')")
            .bind(input_path)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select active assignment by input path"))?;
        row.as_ref().map(Self::from_row).transpose()
    }

    async fn list_pending_oldest_first(&self) -> Result<Vec<EncoderAssignment>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM encoder_assignments WHERE status = 'pending' ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select pending assignments"))?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn list_by_status(&self, status: AssignmentStatus) -> Result<Vec<EncoderAssignment>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM encoder_assignments WHERE status = ?")
            .bind(enum_to_text(&status))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select assignments by status"))?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn list_by_encoder(&self, encoder_id: EncoderId) -> Result<Vec<EncoderAssignment>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM encoder_assignments WHERE encoder_id = ?")
            .bind(encoder_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select assignments by encoder"))?;
        rows.iter().map(Self::from_row).collect()
    }
}
