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
use media_pipeline_domain::entities::PipelineExecution;
use media_pipeline_domain::ports::PipelineExecutionRepository;
use media_pipeline_domain::value_objects::ids::{PipelineExecutionId, ProcessingItemId, RequestId};
use media_pipeline_domain::PipelineError;

use super::error_mapping::{db_err, enum_to_text, text_to_enum};

pub struct SqlitePipelineExecutionRepository {
    pool: SqlitePool,
}

impl SqlitePipelineExecutionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<PipelineExecution, PipelineError> {
        let parent_execution_id: Option<String> = row.try_get("parent_execution_id").map_err(db_err("read parent_execution_id"))?;
        Ok(PipelineExecution {
            id: row.try_get::<String, _>("id").map_err(db_err("read id"))?.parse()?,
            request_id: row.try_get::<String, _>("request_id").map_err(db_err("read request_id"))?.parse()?,
            template_id: row.try_get::<String, _>("template_id").map_err(db_err("read template_id"))?.parse()?,
            parent_execution_id: parent_execution_id.map(|v| v.parse()).transpose()?,
            item_id: row.try_get::<String, _>("item_id").map_err(db_err("read item_id"))?.parse()?,
            status: text_to_enum("execution.status", row.try_get("status").map_err(db_err("read status"))?)?,
            current_step_index: row.try_get::<i64, _>("current_step_index").map_err(db_err("read current_step_index"))? as usize,
            context: ProcessingContext::from_blob(&row.try_get::<String, _>("context").map_err(db_err("read context"))?)?,
            pause_correlation_id: row.try_get("pause_correlation_id").map_err(db_err("read pause_correlation_id"))?,
            started_at: row.try_get::<DateTime<Utc>, _>("started_at").map_err(db_err("read started_at"))?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(db_err("read updated_at"))?,
        })
    }
}

#[async_trait]
impl PipelineExecutionRepository for SqlitePipelineExecutionRepository {
    async fn save(&self, execution: &PipelineExecution) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_executions (id, request_id, template_id, parent_execution_id, item_id, status, current_step_index, context, pause_correlation_id, started_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status, current_step_index = excluded.current_step_index, context = excluded.context,
                pause_correlation_id = excluded.pause_correlation_id, updated_at = excluded.updated_at
            "#,
        )
        .bind(execution.id.to_string())
        .bind(execution.request_id.to_string())
        .bind(execution.template_id.to_string())
        .bind(execution.parent_execution_id.map(|v| v.to_string()))
        .bind(execution.item_id.to_string())
        .bind(enum_to_text(&execution.status))
        .bind(execution.current_step_index as i64)
        .bind(execution.context.to_blob()?)
        .bind(&execution.pause_correlation_id)
        .bind(execution.started_at)
        .bind(execution.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert pipeline execution"))?;
        Ok(())
    }

    async fn get(&self, id: PipelineExecutionId) -> Result<PipelineExecution, PipelineError> {
        let row = sqlx::query("SELECT * FROM pipeline_executions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select pipeline execution"))?
            .ok_or_else(|| PipelineError::not_found(format!("pipeline execution {id}")))?;
        Self::from_row(&row)
    }

    async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<PipelineExecution>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM pipeline_executions WHERE request_id = ?")
            .bind(request_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select executions by request"))?;
        rows.iter().map(Self::from_row).collect()
    }

    async fn find_active_by_item(&self, item_id: ProcessingItemId) -> Result<Option<PipelineExecution>, PipelineError> {
        let row = sqlx::query(
            "SELECT * FROM pipeline_executions WHERE item_id = ? AND status NOT IN ('completed', 'failed', 'cancelled') ORDER BY started_at DESC LIMIT 1",
        )
        .bind(item_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err("select active execution by item"))?;
        row.as_ref().map(Self::from_row).transpose()
    }
}
