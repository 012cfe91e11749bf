// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Repository Adapters (§6's persisted state layout)
//!
//! One adapter per domain repository port, each holding a shared `SqlitePool`
//! and following the teacher's `SqlitePipelineRepository` shape: a `new`
//! that normalizes the connection URL and runs migrations, and operations
//! built from raw `sqlx::query`/`.bind()` calls (not the compile-time
//! `query!` macros, since no live database is reachable from this workspace
//! to validate them against).

mod error_mapping;
pub mod schema;

mod activity_log_repository;
mod circuit_breaker_repository;
mod download_repository;
mod encoder_assignment_repository;
mod execution_repository;
mod library_item_repository;
mod processing_item_repository;
mod remote_encoder_repository;
mod request_repository;
mod template_repository;

pub use activity_log_repository::SqliteActivityLogRepository;
pub use circuit_breaker_repository::SqliteCircuitBreakerRepository;
pub use download_repository::SqliteDownloadRepository;
pub use encoder_assignment_repository::SqliteEncoderAssignmentRepository;
pub use execution_repository::SqlitePipelineExecutionRepository;
pub use library_item_repository::SqliteLibraryItemRepository;
pub use processing_item_repository::SqliteProcessingItemRepository;
pub use remote_encoder_repository::SqliteRemoteEncoderRepository;
pub use request_repository::SqliteRequestRepository;
pub use template_repository::SqliteTemplateRepository;

use sqlx::SqlitePool;

use media_pipeline_domain::entities::PipelineTemplate;
use media_pipeline_domain::ports::PipelineTemplateRepository;
use media_pipeline_domain::value_objects::media_kind::MediaKind;
use media_pipeline_domain::PipelineError;

/// One pool, shared by every adapter above — mirrors the teacher's
/// `SqlitePipelineRepository { pool: SqlitePool }`, just constructed once
/// instead of per-repository.
pub async fn connect(database_url: &str) -> Result<SqlitePool, PipelineError> {
    schema::initialize_database(database_url)
        .await
        .map_err(|e| PipelineError::database(format!("failed to initialize database '{database_url}': {e}")))
}

/// Idempotently inserts `PipelineTemplate::default_linear` for every
/// `MediaKind` missing a default, so a freshly migrated database never 404s
/// on `get_default` before an operator has configured anything. Safe to
/// call on every startup: an existing default is left untouched.
pub async fn seed_default_templates(templates: &dyn PipelineTemplateRepository) -> Result<(), PipelineError> {
    for kind in [MediaKind::Movie, MediaKind::Tv] {
        if let Err(PipelineError::NotFound(_)) = templates.get_default(kind).await {
            templates.save(&PipelineTemplate::default_linear(kind)?).await?;
        }
    }
    Ok(())
}
