// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Recovery Workers (C7, §4.8)
//!
//! Three periodic reconcilers that paper over the gap between "a
//! collaborator finished its work" and "the event that should have told us
//! arrived" — a missed `job:complete`, a torrent client restart, a crash
//! between two writes. Each runs on its own clock (≥1 minute cadence, §5),
//! and per §7's error policy none of them ever let one item's failure stop
//! the sweep: a per-item error is logged and the loop moves on.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use media_pipeline_domain::entities::encoder_assignment::EncoderAssignment;
use media_pipeline_domain::ports::{
    ActivityLogRepository, DownloadRepository, EncoderAssignmentRepository, PipelineTemplateRepository, ProcessingItemRepository,
    RequestRepository,
};
use media_pipeline_domain::value_objects::assignment_status::AssignmentStatus;
use media_pipeline_domain::value_objects::ids::DownloadId;
use media_pipeline_domain::value_objects::processing_status::ProcessingStatus;
use media_pipeline_domain::PipelineError;

use crate::application::executor::Executor;
use crate::application::media_selection::select_video_file;
use crate::application::transitions::{fail_item, transition_item_status, StatusPatch};

/// Matches items stuck in `downloading` against a completed torrent by
/// parsed-name equality and transitions them to `downloaded` (§4.8).
pub struct DownloadRecoveryWorker {
    items: Arc<dyn ProcessingItemRepository>,
    requests: Arc<dyn RequestRepository>,
    downloads: Arc<dyn DownloadRepository>,
    activity_log: Arc<dyn ActivityLogRepository>,
}

impl DownloadRecoveryWorker {
    pub fn new(
        items: Arc<dyn ProcessingItemRepository>,
        requests: Arc<dyn RequestRepository>,
        downloads: Arc<dyn DownloadRepository>,
        activity_log: Arc<dyn ActivityLogRepository>,
    ) -> Self {
        Self { items, requests, downloads, activity_log }
    }

    pub async fn sweep_once(&self) -> usize {
        let mut recovered = 0;
        let items = match self.items.list_by_status(ProcessingStatus::Downloading).await {
            Ok(items) => items,
            Err(err) => {
                warn!(%err, "download recovery: failed to list downloading items");
                return 0;
            }
        };

        for item in items {
            if let Err(err) = self.recover_one(&item).await {
                warn!(item_id = %item.id, %err, "download recovery: sweep failed for item");
                continue;
            }
            recovered += 1;
        }
        recovered
    }

    async fn recover_one(&self, item: &media_pipeline_domain::entities::ProcessingItem) -> Result<(), PipelineError> {
        let request = self.requests.get(item.request_id).await?;
        let candidates = self.downloads.list_by_request(item.request_id).await?;
        let Some(download) = candidates
            .iter()
            .find(|d| d.is_complete() && d.matches_parsed_name(&request.title, Some(request.year), item.season))
        else {
            return Ok(());
        };

        let Some(content_path) = download.content_path.clone() else {
            return Ok(());
        };

        let episode = item.episode.map(|ep| (item.season.unwrap_or(1), ep));
        let video = match select_video_file(&content_path, episode).await {
            Ok(path) => path,
            Err(err) => {
                fail_item(self.items.as_ref(), self.activity_log.as_ref(), item.id, format!("no video file found in completed download: {err}")).await?;
                return Ok(());
            }
        };

        let mut patch = StatusPatch::default().with_download_id(Some(download.id)).with_source_file_path(Some(video.clone()));
        patch = patch.with_context({
            let mut context = item.step_context.clone();
            context.download.source_file_path = Some(video);
            context.download.torrent_hash = Some(download.torrent_hash.clone());
            context
        });

        transition_item_status(self.items.as_ref(), self.activity_log.as_ref(), item.id, ProcessingStatus::Downloaded, patch).await?;
        info!(item_id = %item.id, download_id = %download.id, "download recovery: matched completed torrent");
        Ok(())
    }

    pub async fn run_forever(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let recovered = self.sweep_once().await;
            if recovered > 0 {
                info!(recovered, "download recovery sweep completed");
            }
        }
    }
}

/// Builds the `EncodedFile` context entry for a completed assignment,
/// looking the resolution/codec up from the default template's "encode" step
/// config (the same descriptor `EncodeStep` validated against when the job
/// was enqueued). Shared by this worker's own recovery sweep and the encoder
/// dispatch fabric's resume path (`application_root::spawn_resume_loop`) —
/// both react to the same "assignment completed" fact, just on different
/// triggers.
pub(crate) async fn build_encoded_file(
    templates: &dyn PipelineTemplateRepository,
    kind: media_pipeline_domain::value_objects::media_kind::MediaKind,
    item: &media_pipeline_domain::entities::ProcessingItem,
    assignment: &EncoderAssignment,
) -> media_pipeline_domain::context::EncodedFile {
    let template = templates.get_default(kind).await.ok();
    let (resolution, codec) = template
        .as_ref()
        .and_then(|t| t.step_by_name("encode"))
        .and_then(|descriptor| {
            let resolution = descriptor.config.get("resolution")?.as_str()?.to_string();
            let codec = descriptor.config.get("codec")?.as_str()?.to_string();
            Some((resolution, codec))
        })
        .unwrap_or_else(|| ("unknown".to_string(), "unknown".to_string()));

    media_pipeline_domain::context::EncodedFile {
        path: assignment.output_path.clone(),
        resolution,
        codec,
        target_server_ids: Vec::new(),
        season: item.season,
        episode: item.episode,
        episode_id: None,
    }
}

/// Reconciles items in `encoding` against `EncoderAssignment` state: orphans
/// items whose owning request is gone, folds a completed assignment's output
/// back into the item's context, and fails items whose assignment gave up
/// (§4.8).
pub struct EncoderMonitorWorker {
    items: Arc<dyn ProcessingItemRepository>,
    requests: Arc<dyn RequestRepository>,
    assignments: Arc<dyn EncoderAssignmentRepository>,
    templates: Arc<dyn PipelineTemplateRepository>,
    activity_log: Arc<dyn ActivityLogRepository>,
}

impl EncoderMonitorWorker {
    pub fn new(
        items: Arc<dyn ProcessingItemRepository>,
        requests: Arc<dyn RequestRepository>,
        assignments: Arc<dyn EncoderAssignmentRepository>,
        templates: Arc<dyn PipelineTemplateRepository>,
        activity_log: Arc<dyn ActivityLogRepository>,
    ) -> Self {
        Self { items, requests, assignments, templates, activity_log }
    }

    pub async fn sweep_once(&self) -> usize {
        let mut reconciled = 0;
        let items = match self.items.list_by_status(ProcessingStatus::Encoding).await {
            Ok(items) => items,
            Err(err) => {
                warn!(%err, "encoder monitor: failed to list encoding items");
                return 0;
            }
        };

        for item in items {
            if let Err(err) = self.reconcile_one(&item).await {
                warn!(item_id = %item.id, %err, "encoder monitor: sweep failed for item");
                continue;
            }
            reconciled += 1;
        }
        reconciled
    }

    async fn reconcile_one(&self, item: &media_pipeline_domain::entities::ProcessingItem) -> Result<(), PipelineError> {
        let request = match self.requests.get(item.request_id).await {
            Ok(request) => request,
            Err(PipelineError::NotFound(_)) => {
                fail_item(self.items.as_ref(), self.activity_log.as_ref(), item.id, "owning request no longer exists").await?;
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        if request.status.is_terminal() {
            fail_item(self.items.as_ref(), self.activity_log.as_ref(), item.id, "owning request reached a terminal state").await?;
            return Ok(());
        }

        let Some(assignment_id) = item.encoding_job_id else {
            return Ok(());
        };
        let assignment = self.assignments.get(assignment_id).await?;

        match assignment.status {
            AssignmentStatus::Completed => self.apply_completed(item, &assignment, request.kind).await,
            AssignmentStatus::Failed | AssignmentStatus::Cancelled => {
                fail_item(self.items.as_ref(), self.activity_log.as_ref(), item.id, assignment.error.clone().unwrap_or_else(|| "encoding job did not complete".into()))
                    .await?;
                Ok(())
            }
            AssignmentStatus::Pending | AssignmentStatus::Encoding => Ok(()),
        }
    }

    async fn apply_completed(
        &self,
        item: &media_pipeline_domain::entities::ProcessingItem,
        assignment: &EncoderAssignment,
        kind: media_pipeline_domain::value_objects::media_kind::MediaKind,
    ) -> Result<(), PipelineError> {
        let mut context = item.step_context.clone();
        context.encode.encoded_files.push(build_encoded_file(self.templates.as_ref(), kind, item, assignment).await);

        let patch = StatusPatch::default().with_context(context).with_progress(100);
        transition_item_status(self.items.as_ref(), self.activity_log.as_ref(), item.id, ProcessingStatus::Encoded, patch).await?;
        info!(item_id = %item.id, assignment_id = %assignment.id, "encoder monitor: reconciled completed assignment");
        Ok(())
    }

    pub async fn run_forever(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let reconciled = self.sweep_once().await;
            if reconciled > 0 {
                info!(reconciled, "encoder monitor sweep completed");
            }
        }
    }
}

/// Three independent sub-sweeps over items that have stalled mid-step
/// without a `Failed` transition to show for it (§4.8).
pub struct StuckItemRecoveryWorker {
    items: Arc<dyn ProcessingItemRepository>,
    downloads: Arc<dyn DownloadRepository>,
    activity_log: Arc<dyn ActivityLogRepository>,
    stuck_after: chrono::Duration,
}

impl StuckItemRecoveryWorker {
    pub fn new(items: Arc<dyn ProcessingItemRepository>, downloads: Arc<dyn DownloadRepository>, activity_log: Arc<dyn ActivityLogRepository>) -> Self {
        Self { items, downloads, activity_log, stuck_after: chrono::Duration::minutes(5) }
    }

    pub async fn sweep_once(&self) -> usize {
        let mut recovered = 0;
        recovered += self.reset_unlinked_found_items().await;
        recovered += self.finish_or_reset_stalled_downloads().await;
        recovered += self.link_stray_season_items().await;
        recovered
    }

    /// `pending` is only reachable from `failed` (C1), so resetting a stuck
    /// non-terminal item routes through a `failed` hop first — the same
    /// attempts/lastError reset `ProcessingItem::apply_transition` already
    /// does on `failed -> pending` then applies here too.
    async fn reset_to_pending(&self, item_id: media_pipeline_domain::value_objects::ids::ProcessingItemId, reason: impl Into<String>) -> Result<media_pipeline_domain::entities::ProcessingItem, PipelineError> {
        fail_item(self.items.as_ref(), self.activity_log.as_ref(), item_id, reason).await?;
        let patch = StatusPatch::default().with_download_id(None);
        transition_item_status(self.items.as_ref(), self.activity_log.as_ref(), item_id, ProcessingStatus::Pending, patch).await
    }

    /// Sub-sweep 1: items in `found` with no `downloadId` after the stall
    /// window are reset back to `pending` so the search step re-runs.
    async fn reset_unlinked_found_items(&self) -> usize {
        let now = Utc::now();
        let mut reset = 0;
        let items = match self.items.list_by_status(ProcessingStatus::Found).await {
            Ok(items) => items,
            Err(err) => {
                warn!(%err, "stuck item recovery: failed to list found items");
                return 0;
            }
        };
        for item in items {
            if item.download_id.is_some() {
                continue;
            }
            if now.signed_duration_since(item.updated_at) < self.stuck_after {
                continue;
            }
            if let Err(err) = self.reset_to_pending(item.id, "reset: no download linked within stall window").await {
                warn!(item_id = %item.id, %err, "stuck item recovery: failed to reset unlinked found item");
                continue;
            }
            reset += 1;
        }
        reset
    }

    /// Sub-sweep 2: items in `downloading` at `progress >= 100` with no
    /// forward transition after the stall window either finish (if the
    /// torrent confirms a content path) or reset to `pending`.
    async fn finish_or_reset_stalled_downloads(&self) -> usize {
        let now = Utc::now();
        let mut handled = 0;
        let items = match self.items.list_by_status(ProcessingStatus::Downloading).await {
            Ok(items) => items,
            Err(err) => {
                warn!(%err, "stuck item recovery: failed to list downloading items");
                return 0;
            }
        };
        for item in items {
            if item.progress < 100 || now.signed_duration_since(item.updated_at) < self.stuck_after {
                continue;
            }

            let download = match item.download_id {
                Some(id) => self.downloads.get(id).await.ok(),
                None => None,
            };

            let result = match download.filter(|d| d.is_complete() && d.content_path.is_some()) {
                Some(download) => {
                    let content_path = download.content_path.clone().unwrap();
                    let episode = item.episode.map(|ep| (item.season.unwrap_or(1), ep));
                    match select_video_file(&content_path, episode).await {
                        Ok(video) => {
                            let mut context = item.step_context.clone();
                            context.download.source_file_path = Some(video.clone());
                            let patch = StatusPatch::default().with_source_file_path(Some(video)).with_context(context);
                            transition_item_status(self.items.as_ref(), self.activity_log.as_ref(), item.id, ProcessingStatus::Downloaded, patch).await
                        }
                        Err(err) => {
                            fail_item(self.items.as_ref(), self.activity_log.as_ref(), item.id, format!("no video file found in completed download: {err}")).await
                        }
                    }
                }
                None => self.reset_to_pending(item.id, "reset: download stalled past progress without completing").await,
            };

            match result {
                Ok(_) => handled += 1,
                Err(err) => warn!(item_id = %item.id, %err, "stuck item recovery: failed to resolve stalled download"),
            }
        }
        handled
    }

    /// Sub-sweep 3: groups `downloading` items by `(requestId, season)` to
    /// find seasons where some episodes already carry a `downloadId` and
    /// others don't — the stragglers are linked to the shared download.
    async fn link_stray_season_items(&self) -> usize {
        let mut linked = 0;
        let items = match self.items.list_by_status(ProcessingStatus::Downloading).await {
            Ok(items) => items,
            Err(err) => {
                warn!(%err, "stuck item recovery: failed to list downloading items for season grouping");
                return 0;
            }
        };

        let mut groups: HashMap<(media_pipeline_domain::value_objects::ids::RequestId, u32), Vec<media_pipeline_domain::entities::ProcessingItem>> =
            HashMap::new();
        for item in items {
            if let Some(season) = item.season {
                groups.entry((item.request_id, season)).or_default().push(item);
            }
        }

        for ((_request_id, _season), group) in groups {
            let linked_id: Option<DownloadId> = group.iter().find_map(|i| i.download_id);
            let Some(linked_id) = linked_id else {
                continue;
            };
            for item in group.into_iter().filter(|i| i.download_id.is_none()) {
                let patch = StatusPatch::default().with_download_id(Some(linked_id));
                if let Err(err) = transition_item_status(self.items.as_ref(), self.activity_log.as_ref(), item.id, ProcessingStatus::Downloading, patch).await
                {
                    warn!(item_id = %item.id, %err, "stuck item recovery: failed to link stray season item");
                    continue;
                }
                linked += 1;
            }
        }
        linked
    }

    pub async fn run_forever(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let handled = self.sweep_once().await;
            if handled > 0 {
                info!(handled, "stuck item recovery sweep completed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use media_pipeline_domain::entities::{ActivityLogEntry, Download, PipelineTemplate, ProcessingItem, Request};
    use media_pipeline_domain::value_objects::ids::{EncoderAssignmentId, EncoderId, ProcessingItemId, RequestId};
    use media_pipeline_domain::value_objects::media_kind::MediaKind;
    use std::collections::HashMap as Map;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeItems(Mutex<Map<ProcessingItemId, ProcessingItem>>);
    #[async_trait]
    impl ProcessingItemRepository for FakeItems {
        async fn save(&self, item: &ProcessingItem) -> Result<(), PipelineError> {
            self.0.lock().unwrap().insert(item.id, item.clone());
            Ok(())
        }
        async fn get(&self, id: ProcessingItemId) -> Result<ProcessingItem, PipelineError> {
            self.0.lock().unwrap().get(&id).cloned().ok_or_else(|| PipelineError::not_found("item"))
        }
        async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<ProcessingItem>, PipelineError> {
            Ok(self.0.lock().unwrap().values().filter(|i| i.request_id == request_id).cloned().collect())
        }
        async fn list_by_status(&self, status: ProcessingStatus) -> Result<Vec<ProcessingItem>, PipelineError> {
            Ok(self.0.lock().unwrap().values().filter(|i| i.status == status).cloned().collect())
        }
        async fn list_by_request_and_season(&self, request_id: RequestId, season: u32) -> Result<Vec<ProcessingItem>, PipelineError> {
            Ok(self.0.lock().unwrap().values().filter(|i| i.request_id == request_id && i.season == Some(season)).cloned().collect())
        }
    }

    #[derive(Default)]
    struct FakeRequests(Mutex<Map<RequestId, Request>>);
    #[async_trait]
    impl RequestRepository for FakeRequests {
        async fn save(&self, request: &Request) -> Result<(), PipelineError> {
            self.0.lock().unwrap().insert(request.id, request.clone());
            Ok(())
        }
        async fn get(&self, id: RequestId) -> Result<Request, PipelineError> {
            self.0.lock().unwrap().get(&id).cloned().ok_or_else(|| PipelineError::not_found("request"))
        }
        async fn list_active(&self) -> Result<Vec<Request>, PipelineError> {
            Ok(self.0.lock().unwrap().values().filter(|r| !r.status.is_terminal()).cloned().collect())
        }
    }

    #[derive(Default)]
    struct FakeDownloads(Mutex<Map<DownloadId, Download>>);
    #[async_trait]
    impl DownloadRepository for FakeDownloads {
        async fn save(&self, download: &Download) -> Result<(), PipelineError> {
            self.0.lock().unwrap().insert(download.id, download.clone());
            Ok(())
        }
        async fn get(&self, id: DownloadId) -> Result<Download, PipelineError> {
            self.0.lock().unwrap().get(&id).cloned().ok_or_else(|| PipelineError::not_found("download"))
        }
        async fn get_by_hash(&self, torrent_hash: &str) -> Result<Option<Download>, PipelineError> {
            Ok(self.0.lock().unwrap().values().find(|d| d.torrent_hash == torrent_hash).cloned())
        }
        async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<Download>, PipelineError> {
            Ok(self.0.lock().unwrap().values().filter(|d| d.request_id == request_id).cloned().collect())
        }
    }

    #[derive(Default)]
    struct FakeLog(Mutex<Vec<ActivityLogEntry>>);
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

    #[derive(Default)]
    struct FakeAssignments(Mutex<Map<EncoderAssignmentId, EncoderAssignment>>);
    #[async_trait]
    impl EncoderAssignmentRepository for FakeAssignments {
        async fn save(&self, assignment: &EncoderAssignment) -> Result<(), PipelineError> {
            self.0.lock().unwrap().insert(assignment.id, assignment.clone());
            Ok(())
        }
        async fn get(&self, id: EncoderAssignmentId) -> Result<EncoderAssignment, PipelineError> {
            self.0.lock().unwrap().get(&id).cloned().ok_or_else(|| PipelineError::not_found("assignment"))
        }
        async fn get_by_job_id(&self, job_id: ProcessingItemId) -> Result<Option<EncoderAssignment>, PipelineError> {
            Ok(self.0.lock().unwrap().values().find(|a| a.job_id == job_id).cloned())
        }
        async fn find_active_by_input_path(&self, input_path: &str) -> Result<Option<EncoderAssignment>, PipelineError> {
            Ok(self.0.lock().unwrap().values().find(|a| a.input_path == input_path && a.status.is_active()).cloned())
        }
        async fn list_pending_oldest_first(&self) -> Result<Vec<EncoderAssignment>, PipelineError> {
            Ok(vec![])
        }
        async fn list_by_status(&self, status: AssignmentStatus) -> Result<Vec<EncoderAssignment>, PipelineError> {
            Ok(self.0.lock().unwrap().values().filter(|a| a.status == status).cloned().collect())
        }
        async fn list_by_encoder(&self, _encoder_id: EncoderId) -> Result<Vec<EncoderAssignment>, PipelineError> {
            Ok(vec![])
        }
    }

    struct FakeTemplates(PipelineTemplate);
    #[async_trait]
    impl PipelineTemplateRepository for FakeTemplates {
        async fn save(&self, _template: &PipelineTemplate) -> Result<(), PipelineError> {
            Ok(())
        }
        async fn get(&self, _id: media_pipeline_domain::value_objects::ids::PipelineTemplateId) -> Result<PipelineTemplate, PipelineError> {
            Ok(self.0.clone())
        }
        async fn get_default(&self, _kind: MediaKind) -> Result<PipelineTemplate, PipelineError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn download_recovery_matches_completed_torrent_by_parsed_name() {
        let items = Arc::new(FakeItems::default());
        let requests = Arc::new(FakeRequests::default());
        let downloads = Arc::new(FakeDownloads::default());
        let log = Arc::new(FakeLog::default());

        let request = Request::new_movie("tmdb-1", "The Matrix", 1999, vec![]);
        let mut item = ProcessingItem::new_movie(request.id, 3);
        item.status = ProcessingStatus::Downloading;
        requests.0.lock().unwrap().insert(request.id, request.clone());
        items.0.lock().unwrap().insert(item.id, item.clone());

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("the.matrix.mkv"), vec![0u8; 10]).unwrap();

        let mut download = Download::new(request.id, "hash1", "the matrix", Some(1999), None);
        download.state = media_pipeline_domain::entities::DownloadState::Completed;
        download.percent_complete = 100;
        download.content_path = Some(dir.path().to_str().unwrap().to_string());
        downloads.0.lock().unwrap().insert(download.id, download.clone());

        let worker = DownloadRecoveryWorker::new(items.clone(), requests, downloads, log);
        let recovered = worker.sweep_once().await;

        assert_eq!(recovered, 1);
        let updated = items.0.lock().unwrap().get(&item.id).cloned().unwrap();
        assert_eq!(updated.status, ProcessingStatus::Downloaded);
        assert_eq!(updated.download_id, Some(download.id));
        assert!(updated.step_context.download.source_file_path.unwrap().ends_with("the.matrix.mkv"));
    }

    #[tokio::test]
    async fn download_recovery_fails_the_item_when_no_video_file_is_found() {
        let items = Arc::new(FakeItems::default());
        let requests = Arc::new(FakeRequests::default());
        let downloads = Arc::new(FakeDownloads::default());
        let log = Arc::new(FakeLog::default());

        let request = Request::new_movie("tmdb-1", "The Matrix", 1999, vec![]);
        let mut item = ProcessingItem::new_movie(request.id, 3);
        item.status = ProcessingStatus::Downloading;
        requests.0.lock().unwrap().insert(request.id, request.clone());
        items.0.lock().unwrap().insert(item.id, item.clone());

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), vec![0u8; 10]).unwrap();

        let mut download = Download::new(request.id, "hash1", "the matrix", Some(1999), None);
        download.state = media_pipeline_domain::entities::DownloadState::Completed;
        download.percent_complete = 100;
        download.content_path = Some(dir.path().to_str().unwrap().to_string());
        downloads.0.lock().unwrap().insert(download.id, download.clone());

        let worker = DownloadRecoveryWorker::new(items.clone(), requests, downloads, log);
        worker.sweep_once().await;

        let updated = items.0.lock().unwrap().get(&item.id).cloned().unwrap();
        assert_eq!(updated.status, ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn encoder_monitor_fails_orphaned_item_when_request_is_gone() {
        let items = Arc::new(FakeItems::default());
        let requests = Arc::new(FakeRequests::default());
        let assignments = Arc::new(FakeAssignments::default());
        let templates = Arc::new(FakeTemplates(PipelineTemplate::default_linear(MediaKind::Movie).unwrap()));
        let log = Arc::new(FakeLog::default());

        let mut item = ProcessingItem::new_movie(RequestId::new(), 3);
        item.status = ProcessingStatus::Encoding;
        items.0.lock().unwrap().insert(item.id, item.clone());

        let worker = EncoderMonitorWorker::new(items.clone(), requests, assignments, templates, log);
        let reconciled = worker.sweep_once().await;

        assert_eq!(reconciled, 1);
        let updated = items.0.lock().unwrap().get(&item.id).cloned().unwrap();
        assert_eq!(updated.status, ProcessingStatus::Failed);
    }

    #[tokio::test]
    async fn encoder_monitor_reconciles_a_completed_assignment() {
        let items = Arc::new(FakeItems::default());
        let requests = Arc::new(FakeRequests::default());
        let assignments = Arc::new(FakeAssignments::default());
        let templates = Arc::new(FakeTemplates(PipelineTemplate::default_linear(MediaKind::Movie).unwrap()));
        let log = Arc::new(FakeLog::default());

        let request = Request::new_movie("tmdb-2", "Arrival", 2016, vec![]);
        requests.0.lock().unwrap().insert(request.id, request.clone());

        let mut assignment = EncoderAssignment::new(ProcessingItemId::new(), "/in.mkv", "/out.mkv", "p1", 2);
        assignment.assign_to(EncoderId::new()).unwrap();
        assignment.complete(1_000, 0.5, 120).unwrap();
        assignments.0.lock().unwrap().insert(assignment.id, assignment.clone());

        let mut item = ProcessingItem::new_movie(request.id, 3);
        item.status = ProcessingStatus::Encoding;
        item.encoding_job_id = Some(assignment.id);
        items.0.lock().unwrap().insert(item.id, item.clone());

        let worker = EncoderMonitorWorker::new(items.clone(), requests, assignments, templates, log);
        let reconciled = worker.sweep_once().await;

        assert_eq!(reconciled, 1);
        let updated = items.0.lock().unwrap().get(&item.id).cloned().unwrap();
        assert_eq!(updated.status, ProcessingStatus::Encoded);
        assert_eq!(updated.step_context.encode.encoded_files.len(), 1);
        assert_eq!(updated.step_context.encode.encoded_files[0].path, "/out.mkv");
    }

    #[tokio::test]
    async fn stuck_item_recovery_resets_unlinked_found_items_past_the_stall_window() {
        let items = Arc::new(FakeItems::default());
        let downloads = Arc::new(FakeDownloads::default());
        let log = Arc::new(FakeLog::default());

        let mut item = ProcessingItem::new_movie(RequestId::new(), 3);
        item.status = ProcessingStatus::Found;
        item.updated_at = Utc::now() - chrono::Duration::minutes(10);
        items.0.lock().unwrap().insert(item.id, item.clone());

        let worker = StuckItemRecoveryWorker::new(items.clone(), downloads, log);
        let handled = worker.sweep_once().await;

        assert_eq!(handled, 1);
        let updated = items.0.lock().unwrap().get(&item.id).cloned().unwrap();
        assert_eq!(updated.status, ProcessingStatus::Pending);
    }

    #[tokio::test]
    async fn stuck_item_recovery_finishes_a_stalled_download_by_scanning_for_the_video() {
        let items = Arc::new(FakeItems::default());
        let downloads = Arc::new(FakeDownloads::default());
        let log = Arc::new(FakeLog::default());

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("movie.mkv"), vec![0u8; 10]).unwrap();
        let mut download = Download::new(RequestId::new(), "hash2", "x", None, None);
        download.state = media_pipeline_domain::entities::DownloadState::Completed;
        download.percent_complete = 100;
        download.content_path = Some(dir.path().to_str().unwrap().to_string());
        downloads.0.lock().unwrap().insert(download.id, download.clone());

        let mut item = ProcessingItem::new_movie(RequestId::new(), 3);
        item.status = ProcessingStatus::Downloading;
        item.progress = 100;
        item.download_id = Some(download.id);
        item.updated_at = Utc::now() - chrono::Duration::minutes(10);
        items.0.lock().unwrap().insert(item.id, item.clone());

        let worker = StuckItemRecoveryWorker::new(items.clone(), downloads, log);
        let handled = worker.sweep_once().await;

        assert_eq!(handled, 1);
        let updated = items.0.lock().unwrap().get(&item.id).cloned().unwrap();
        assert_eq!(updated.status, ProcessingStatus::Downloaded);
        assert!(updated.step_context.download.source_file_path.unwrap().ends_with("movie.mkv"));
    }

    #[tokio::test]
    async fn stuck_item_recovery_resets_a_stalled_download_with_no_completed_content() {
        let items = Arc::new(FakeItems::default());
        let downloads = Arc::new(FakeDownloads::default());
        let log = Arc::new(FakeLog::default());

        let mut download = Download::new(RequestId::new(), "hash3", "x", None, None);
        download.state = media_pipeline_domain::entities::DownloadState::Downloading;
        download.percent_complete = 60;
        downloads.0.lock().unwrap().insert(download.id, download.clone());

        let mut item = ProcessingItem::new_movie(RequestId::new(), 3);
        item.status = ProcessingStatus::Downloading;
        item.progress = 100;
        item.download_id = Some(download.id);
        item.updated_at = Utc::now() - chrono::Duration::minutes(10);
        items.0.lock().unwrap().insert(item.id, item.clone());

        let worker = StuckItemRecoveryWorker::new(items.clone(), downloads, log);
        let handled = worker.sweep_once().await;

        assert_eq!(handled, 1);
        let updated = items.0.lock().unwrap().get(&item.id).cloned().unwrap();
        assert_eq!(updated.status, ProcessingStatus::Pending);
    }

    #[tokio::test]
    async fn stuck_item_recovery_leaves_recently_updated_items_alone() {
        let items = Arc::new(FakeItems::default());
        let downloads = Arc::new(FakeDownloads::default());
        let log = Arc::new(FakeLog::default());

        let mut item = ProcessingItem::new_movie(RequestId::new(), 3);
        item.status = ProcessingStatus::Found;
        items.0.lock().unwrap().insert(item.id, item.clone());

        let worker = StuckItemRecoveryWorker::new(items.clone(), downloads, log);
        let handled = worker.sweep_once().await;

        assert_eq!(handled, 0);
        let updated = items.0.lock().unwrap().get(&item.id).cloned().unwrap();
        assert_eq!(updated.status, ProcessingStatus::Found);
    }
}
