// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use media_pipeline_domain::entities::PipelineTemplate;
use media_pipeline_domain::ports::PipelineTemplateRepository;
use media_pipeline_domain::value_objects::ids::PipelineTemplateId;
use media_pipeline_domain::value_objects::media_kind::MediaKind;
use media_pipeline_domain::PipelineError;

use super::error_mapping::{db_err, enum_to_text, from_json, text_to_enum, to_json};

pub struct SqliteTemplateRepository {
    pool: SqlitePool,
}

impl SqliteTemplateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<PipelineTemplate, PipelineError> {
        Ok(PipelineTemplate {
            id: row.try_get::<String, _>("id").map_err(db_err("read id"))?.parse()?,
            media_kind: text_to_enum("template.media_kind", row.try_get("media_kind").map_err(db_err("read media_kind"))?)?,
            is_default: row.try_get::<i64, _>("is_default").map_err(db_err("read is_default"))? != 0,
            name: row.try_get("name").map_err(db_err("read name"))?,
            steps: from_json("template.steps", row.try_get("steps").map_err(db_err("read steps"))?)?,
        })
    }
}

#[async_trait]
impl PipelineTemplateRepository for SqliteTemplateRepository {
    async fn save(&self, template: &PipelineTemplate) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO pipeline_templates (id, media_kind, is_default, name, steps)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                is_default = excluded.is_default, name = excluded.name, steps = excluded.steps
            "#,
        )
        .bind(template.id.to_string())
        .bind(enum_to_text(&template.media_kind))
        .bind(template.is_default as i64)
        .bind(&template.name)
        .bind(to_json("template.steps", &template.steps)?)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert template"))?;
        Ok(())
    }

    async fn get(&self, id: PipelineTemplateId) -> Result<PipelineTemplate, PipelineError> {
        let row = sqlx::query("SELECT * FROM pipeline_templates WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select template"))?
            .ok_or_else(|| PipelineError::not_found(format!("pipeline template {id}")))?;
        Self::from_row(&row)
    }

    async fn get_default(&self, kind: MediaKind) -> Result<PipelineTemplate, PipelineError> {
        let row = sqlx::query("SELECT * FROM pipeline_templates WHERE media_kind = ? AND is_default = 1")
            .bind(enum_to_text(&kind))
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select default template"))?
            .ok_or_else(|| PipelineError::not_found(format!("default template for {kind:?}")))?;
        Self::from_row(&row)
    }
}
