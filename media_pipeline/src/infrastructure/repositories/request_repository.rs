// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use media_pipeline_domain::entities::Request;
use media_pipeline_domain::ports::RequestRepository;
use media_pipeline_domain::value_objects::ids::{RequestId, ServerId};
use media_pipeline_domain::value_objects::media_kind::MediaKind;
use media_pipeline_domain::value_objects::request_status::RequestStatus;
use media_pipeline_domain::PipelineError;

use super::error_mapping::{db_err, enum_to_text, from_json, text_to_enum, to_json};

pub struct SqliteRequestRepository {
    pool: SqlitePool,
}

impl SqliteRequestRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Request, PipelineError> {
        let targets: Vec<String> = from_json("request.targets", row.try_get("targets").map_err(db_err("read targets"))?)?;
        Ok(Request {
            id: row.try_get::<String, _>("id").map_err(db_err("read id"))?.parse()?,
            kind: text_to_enum("request.kind", row.try_get("kind").map_err(db_err("read kind"))?)?,
            external_id: row.try_get("external_id").map_err(db_err("read external_id"))?,
            title: row.try_get("title").map_err(db_err("read title"))?,
            year: row.try_get::<i64, _>("year").map_err(db_err("read year"))? as u16,
            requested_seasons: from_json("request.requested_seasons", row.try_get("requested_seasons").map_err(db_err("read requested_seasons"))?)?,
            requested_episodes: from_json("request.requested_episodes", row.try_get("requested_episodes").map_err(db_err("read requested_episodes"))?)?,
            targets: targets.iter().map(|t| t.parse()).collect::<Result<Vec<ServerId>, _>>()?,
            status: text_to_enum("request.status", row.try_get("status").map_err(db_err("read status"))?)?,
            progress: row.try_get::<i64, _>("progress").map_err(db_err("read progress"))? as u8,
            current_step: row.try_get("current_step").map_err(db_err("read current_step"))?,
            error: row.try_get("error").map_err(db_err("read error"))?,
            available_releases: from_json("request.available_releases", row.try_get("available_releases").map_err(db_err("read available_releases"))?)?,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(db_err("read created_at"))?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at").map_err(db_err("read updated_at"))?,
        })
    }
}

#[async_trait]
impl RequestRepository for SqliteRequestRepository {
    async fn save(&self, request: &Request) -> Result<(), PipelineError> {
        let targets: Vec<String> = request.targets.iter().map(|t| t.to_string()).collect();
        sqlx::query(
            r#"
            INSERT INTO requests (id, kind, external_id, title, year, requested_seasons, requested_episodes, targets, status, progress, current_step, error, available_releases, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status, progress = excluded.progress, current_step = excluded.current_step,
                error = excluded.error, available_releases = excluded.available_releases, updated_at = excluded.updated_at
            "#,
        )
        .bind(request.id.to_string())
        .bind(enum_to_text(&request.kind))
        .bind(&request.external_id)
        .bind(&request.title)
        .bind(request.year as i64)
        .bind(to_json("request.requested_seasons", &request.requested_seasons)?)
        .bind(to_json("request.requested_episodes", &request.requested_episodes)?)
        .bind(to_json("request.targets", &targets)?)
        .bind(enum_to_text(&request.status))
        .bind(request.progress as i64)
        .bind(&request.current_step)
        .bind(&request.error)
        .bind(to_json("request.available_releases", &request.available_releases)?)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert request"))?;
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Request, PipelineError> {
        let row = sqlx::query("SELECT * FROM requests WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select request"))?
            .ok_or_else(|| PipelineError::not_found(format!("request {id}")))?;
        Self::from_row(&row)
    }

    async fn list_active(&self) -> Result<Vec<Request>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM requests WHERE status NOT IN ('completed', 'failed', 'cancelled')")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err("select active requests"))?;
        rows.iter().map(Self::from_row).collect()
    }
}
