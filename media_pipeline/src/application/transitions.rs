// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # The Single Writer of `ProcessingItem.status` (§4.7, §5)
//!
//! §5 requires every `ProcessingItem`'s operations to be "strictly serialised
//! by the orchestrator's single-writer `transitionStatus`". The executor
//! (C5), the encoder dispatch fabric (C9), and every recovery worker (C7)
//! all need to perform that write, which would make them own each other if
//! it were a method on the orchestrator struct. Instead it is a free
//! function taking trait-object references — the same write path, callable
//! from anywhere that holds a `&dyn ProcessingItemRepository`, with no
//! circular `Arc` between the executor and the orchestrator.

use chrono::{DateTime, Utc};
use media_pipeline_domain::entities::{ActivityLogEntry, ActivitySeverity, ProcessingItem};
use media_pipeline_domain::ports::{ActivityLogRepository, ProcessingItemRepository};
use media_pipeline_domain::value_objects::ids::{DownloadId, EncoderAssignmentId, ProcessingItemId};
use media_pipeline_domain::value_objects::processing_status::ProcessingStatus;
use media_pipeline_domain::{PipelineError, ProcessingContext};

/// The fields a transition may additionally stamp, beyond `status` itself.
/// Every field is `Option` so a caller only names what it actually changed;
/// `Option<Option<T>>` fields let a caller explicitly clear a nullable
/// column (e.g. resetting `download_id` back to `None` on a stuck-item
/// reset, §4.8 sub-sweep 2).
#[derive(Debug, Clone, Default)]
pub struct StatusPatch {
    pub current_step: Option<Option<String>>,
    pub context: Option<ProcessingContext>,
    pub download_id: Option<Option<DownloadId>>,
    pub encoding_job_id: Option<Option<EncoderAssignmentId>>,
    pub source_file_path: Option<Option<String>>,
    pub last_error: Option<Option<String>>,
    pub progress: Option<u8>,
    pub next_retry_at: Option<Option<DateTime<Utc>>>,
    pub skip_until: Option<Option<DateTime<Utc>>>,
    pub attempts: Option<u32>,
}

impl StatusPatch {
    pub fn with_context(mut self, context: ProcessingContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_current_step(mut self, step: Option<String>) -> Self {
        self.current_step = Some(step);
        self
    }

    pub fn with_download_id(mut self, id: Option<DownloadId>) -> Self {
        self.download_id = Some(id);
        self
    }

    pub fn with_encoding_job_id(mut self, id: Option<EncoderAssignmentId>) -> Self {
        self.encoding_job_id = Some(id);
        self
    }

    pub fn with_source_file_path(mut self, path: Option<String>) -> Self {
        self.source_file_path = Some(path);
        self
    }

    pub fn with_last_error(mut self, error: Option<String>) -> Self {
        self.last_error = Some(error);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_next_retry_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.next_retry_at = Some(at);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }
}

fn apply_patch(item: &mut ProcessingItem, patch: StatusPatch) {
    if let Some(step) = patch.current_step {
        item.current_step = step;
    }
    if let Some(context) = patch.context {
        item.step_context = context;
    }
    if let Some(id) = patch.download_id {
        item.download_id = id;
    }
    if let Some(id) = patch.encoding_job_id {
        item.encoding_job_id = id;
    }
    if let Some(path) = patch.source_file_path {
        item.source_file_path = path;
    }
    if let Some(error) = patch.last_error {
        item.last_error = error;
    }
    if let Some(progress) = patch.progress {
        item.progress = progress;
    }
    if let Some(at) = patch.next_retry_at {
        item.next_retry_at = at;
    }
    if let Some(at) = patch.skip_until {
        item.skip_until = at;
    }
    if let Some(attempts) = patch.attempts {
        item.attempts = attempts;
    }
}

/// Validates `to` against C1, applies `patch`, persists, and appends an
/// activity-log entry — the one write path every caller in this crate uses
/// instead of mutating `ProcessingItem.status` directly.
pub async fn transition_item_status(
    items: &dyn ProcessingItemRepository,
    activity_log: &dyn ActivityLogRepository,
    item_id: ProcessingItemId,
    to: ProcessingStatus,
    patch: StatusPatch,
) -> Result<ProcessingItem, PipelineError> {
    let mut item = items.get(item_id).await?;
    let from = item.status;
    item.apply_transition(to)?;
    apply_patch(&mut item, patch);
    items.save(&item).await?;

    if from != to {
        let severity = if to == ProcessingStatus::Failed { ActivitySeverity::Error } else { ActivitySeverity::Info };
        activity_log
            .append(&ActivityLogEntry::new(
                item.request_id,
                severity,
                "item.status.transitioned",
                format!("item {item_id} {from:?} -> {to:?}"),
            ))
            .await?;
    }
    Ok(item)
}

/// Records a failure without the caller needing to know the current status
/// (`ProcessingItem::record_failure` already validates the `-> failed` edge).
pub async fn fail_item(
    items: &dyn ProcessingItemRepository,
    activity_log: &dyn ActivityLogRepository,
    item_id: ProcessingItemId,
    error: impl Into<String>,
) -> Result<ProcessingItem, PipelineError> {
    let error = error.into();
    let mut item = items.get(item_id).await?;
    item.record_failure(error.clone())?;
    items.save(&item).await?;
    activity_log
        .append(&ActivityLogEntry::new(item.request_id, ActivitySeverity::Error, "item.failed", error))
        .await?;
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use media_pipeline_domain::value_objects::ids::RequestId;
    use std::sync::Mutex;

    struct FakeItems(Mutex<ProcessingItem>);
    struct FakeLog(Mutex<Vec<ActivityLogEntry>>);

    #[async_trait]
    impl ProcessingItemRepository for FakeItems {
        async fn save(&self, item: &ProcessingItem) -> Result<(), PipelineError> {
            *self.0.lock().unwrap() = item.clone();
            Ok(())
        }
        async fn get(&self, _id: ProcessingItemId) -> Result<ProcessingItem, PipelineError> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn list_by_request(&self, _request_id: RequestId) -> Result<Vec<ProcessingItem>, PipelineError> {
            Ok(vec![])
        }
        async fn list_by_status(&self, _status: ProcessingStatus) -> Result<Vec<ProcessingItem>, PipelineError> {
            Ok(vec![])
        }
        async fn list_by_request_and_season(&self, _request_id: RequestId, _season: u32) -> Result<Vec<ProcessingItem>, PipelineError> {
            Ok(vec![])
        }
    }

    #[async_trait]
    impl ActivityLogRepository for FakeLog {
        async fn append(&self, entry: &ActivityLogEntry) -> Result<(), PipelineError> {
            self.0.lock().unwrap().push(entry.clone());
            Ok(())
        }
        async fn list_by_request(&self, _request_id: RequestId) -> Result<Vec<ActivityLogEntry>, PipelineError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn transition_persists_patch_and_logs() {
        let item = ProcessingItem::new_movie(RequestId::new(), 3);
        let items = FakeItems(Mutex::new(item.clone()));
        let log = FakeLog(Mutex::new(Vec::new()));

        let patch = StatusPatch::default().with_current_step(Some("search".into())).with_progress(10);
        let updated = transition_item_status(&items, &log, item.id, ProcessingStatus::Searching, patch).await.unwrap();

        assert_eq!(updated.status, ProcessingStatus::Searching);
        assert_eq!(updated.current_step.as_deref(), Some("search"));
        assert_eq!(updated.progress, 10);
        assert_eq!(log.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_transition_is_rejected_and_not_persisted() {
        let mut item = ProcessingItem::new_movie(RequestId::new(), 3);
        item.status = ProcessingStatus::Completed;
        let items = FakeItems(Mutex::new(item.clone()));
        let log = FakeLog(Mutex::new(Vec::new()));

        let result = transition_item_status(&items, &log, item.id, ProcessingStatus::Encoding, StatusPatch::default()).await;
        assert!(result.is_err());
        assert!(log.0.lock().unwrap().is_empty());
    }
}
