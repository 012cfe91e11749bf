// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use media_pipeline_domain::entities::{BreakerConfig, CircuitBreaker};
use media_pipeline_domain::ports::CircuitBreakerRepository;
use media_pipeline_domain::PipelineError;

use super::error_mapping::{db_err, enum_to_text, text_to_enum};

pub struct SqliteCircuitBreakerRepository {
    pool: SqlitePool,
}

impl SqliteCircuitBreakerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// `config` is `#[serde(skip)]` on the entity — `CircuitBreakerService`
    /// overwrites it with its own configured value on every `guard` call, so
    /// the placeholder reconstructed here never observably matters.
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<CircuitBreaker, PipelineError> {
        Ok(CircuitBreaker {
            service: row.try_get("service").map_err(db_err("read service"))?,
            state: text_to_enum("breaker.state", row.try_get("state").map_err(db_err("read state"))?)?,
            failures: row.try_get::<i64, _>("failures").map_err(db_err("read failures"))? as u32,
            successes_in_half_open: row.try_get::<i64, _>("successes_in_half_open").map_err(db_err("read successes_in_half_open"))? as u32,
            last_failure: row.try_get::<Option<DateTime<Utc>>, _>("last_failure").map_err(db_err("read last_failure"))?,
            opens_at: row.try_get::<Option<DateTime<Utc>>, _>("opens_at").map_err(db_err("read opens_at"))?,
            config: BreakerConfig::default(),
        })
    }
}

#[async_trait]
impl CircuitBreakerRepository for SqliteCircuitBreakerRepository {
    async fn save(&self, breaker: &CircuitBreaker) -> Result<(), PipelineError> {
        sqlx::query(
            r#"
            INSERT INTO circuit_breakers (service, state, failures, successes_in_half_open, last_failure, opens_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(service) DO UPDATE SET
                state = excluded.state, failures = excluded.failures, successes_in_half_open = excluded.successes_in_half_open,
                last_failure = excluded.last_failure, opens_at = excluded.opens_at
            "#,
        )
        .bind(&breaker.service)
        .bind(enum_to_text(&breaker.state))
        .bind(breaker.failures as i64)
        .bind(breaker.successes_in_half_open as i64)
        .bind(breaker.last_failure)
        .bind(breaker.opens_at)
        .execute(&self.pool)
        .await
        .map_err(db_err("insert circuit breaker"))?;
        Ok(())
    }

    async fn get_or_create(&self, service: &str) -> Result<CircuitBreaker, PipelineError> {
        let row = sqlx::query("SELECT * FROM circuit_breakers WHERE service = ?")
            .bind(service)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err("select circuit breaker"))?;
        match row {
            Some(row) => Self::from_row(&row),
            None => {
                let breaker = CircuitBreaker::new(service, BreakerConfig::default());
                self.save(&breaker).await?;
                Ok(breaker)
            }
        }
    }
}
