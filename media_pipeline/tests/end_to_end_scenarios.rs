// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end scenarios (spec.md §8) driven through the real `Application`
//! wiring: `StepRegistry`/`Executor`/`Orchestrator` exactly as `main.rs`
//! assembles them, against in-memory fakes standing in for the repository
//! and collaborator ports. The encoder dispatch fabric itself (the
//! WebSocket/axum side of C9) is exercised separately by the
//! `infrastructure::dispatch` unit tests; here its effect on a request is
//! simulated the way the fabric's own resume path would — by posting a
//! `PipelineEvent::EncodeCompleted` for a manually-inserted `EncoderAssignment`
//! row — since a real worker connection is out of scope for this crate's own
//! test suite.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use media_pipeline::application::application_root::{Application, Collaborators, EngineConfig, Repositories};
use media_pipeline::application::naming::NamingConfig;
use media_pipeline::application::{PipelineEvent, ResumeSender};
use media_pipeline_domain::entities::{
    ActivityLogEntry, BreakerConfig, CircuitBreaker, Download, EncoderAssignment, LibraryItem, PipelineExecution, PipelineTemplate,
    ProcessingItem, Request,
};
use media_pipeline_domain::ports::{
    ActivityLogRepository, CircuitBreakerRepository, Clock, DeliveryTransport, DownloadRepository, EncoderAssignmentRepository,
    EncoderDispatchPort, ExistingTorrent, IndexerClient, LibraryItemRepository, NotificationSink, PipelineExecutionRepository,
    PipelineTemplateRepository, ProcessingItemRepository, RequestRepository, TorrentClient,
};
use media_pipeline_domain::value_objects::assignment_status::AssignmentStatus;
use media_pipeline_domain::value_objects::ids::{
    DownloadId, EncoderAssignmentId, EncoderId, PipelineExecutionId, PipelineTemplateId, ProcessingItemId, RequestId, ServerId,
};
use media_pipeline_domain::value_objects::media_kind::MediaKind;
use media_pipeline_domain::value_objects::processing_status::ProcessingStatus;
use media_pipeline_domain::value_objects::release::{Codec, QualityTarget, Release, Resolution};
use media_pipeline_domain::value_objects::request_status::RequestStatus;
use media_pipeline_domain::PipelineError;

// ---------------------------------------------------------------------------
// In-memory fakes for every port `Application::new` needs. Kept in this one
// file rather than shared with the `#[cfg(test)]` fakes colocated in
// `application_root.rs`/`orchestrator.rs` — those are private to their
// module, and an integration test only ever sees the crate's public API.
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakeRequests(Mutex<HashMap<RequestId, Request>>);
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
struct FakeItems(Mutex<HashMap<ProcessingItemId, ProcessingItem>>);
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
struct FakeExecutions(Mutex<HashMap<PipelineExecutionId, PipelineExecution>>);
#[async_trait]
impl PipelineExecutionRepository for FakeExecutions {
    async fn save(&self, execution: &PipelineExecution) -> Result<(), PipelineError> {
        self.0.lock().unwrap().insert(execution.id, execution.clone());
        Ok(())
    }
    async fn get(&self, id: PipelineExecutionId) -> Result<PipelineExecution, PipelineError> {
        self.0.lock().unwrap().get(&id).cloned().ok_or_else(|| PipelineError::not_found("execution"))
    }
    async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<PipelineExecution>, PipelineError> {
        Ok(self.0.lock().unwrap().values().filter(|e| e.request_id == request_id).cloned().collect())
    }
    async fn find_active_by_item(&self, item_id: ProcessingItemId) -> Result<Option<PipelineExecution>, PipelineError> {
        Ok(self.0.lock().unwrap().values().find(|e| e.item_id == item_id && !e.status.is_terminal()).cloned())
    }
}

#[derive(Default)]
struct FakeTemplates(Mutex<Option<PipelineTemplate>>);
#[async_trait]
impl PipelineTemplateRepository for FakeTemplates {
    async fn save(&self, template: &PipelineTemplate) -> Result<(), PipelineError> {
        *self.0.lock().unwrap() = Some(template.clone());
        Ok(())
    }
    async fn get(&self, _id: PipelineTemplateId) -> Result<PipelineTemplate, PipelineError> {
        self.0.lock().unwrap().clone().ok_or_else(|| PipelineError::not_found("template"))
    }
    async fn get_default(&self, _kind: MediaKind) -> Result<PipelineTemplate, PipelineError> {
        self.0.lock().unwrap().clone().ok_or_else(|| PipelineError::not_found("template"))
    }
}

#[derive(Default)]
struct FakeAssignments(Mutex<HashMap<EncoderAssignmentId, EncoderAssignment>>);
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

#[derive(Default)]
struct FakeBreakers(Mutex<HashMap<String, CircuitBreaker>>);
#[async_trait]
impl CircuitBreakerRepository for FakeBreakers {
    async fn save(&self, breaker: &CircuitBreaker) -> Result<(), PipelineError> {
        self.0.lock().unwrap().insert(breaker.service.clone(), breaker.clone());
        Ok(())
    }
    async fn get_or_create(&self, service: &str) -> Result<CircuitBreaker, PipelineError> {
        Ok(self.0.lock().unwrap().entry(service.to_string()).or_insert_with(|| CircuitBreaker::new(service, BreakerConfig::default())).clone())
    }
}

#[derive(Default)]
struct FakeDownloads(Mutex<HashMap<DownloadId, Download>>);
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
struct FakeLibrary(Mutex<HashMap<(String, MediaKind, ServerId), LibraryItem>>);
#[async_trait]
impl LibraryItemRepository for FakeLibrary {
    async fn upsert(&self, item: &LibraryItem) -> Result<(), PipelineError> {
        self.0.lock().unwrap().insert((item.tmdb_id.clone(), item.kind, item.server_id), item.clone());
        Ok(())
    }
    async fn get(&self, tmdb_id: &str, kind: MediaKind, server_id: ServerId) -> Result<Option<LibraryItem>, PipelineError> {
        Ok(self.0.lock().unwrap().get(&(tmdb_id.to_string(), kind, server_id)).cloned())
    }
}

/// Reports one configured release (or none) for every search, regardless of
/// title/year/season — these scenarios only ever run a single request at a
/// time, so there is nothing to disambiguate by.
#[derive(Default)]
struct FakeIndexer(Mutex<Vec<Release>>);
#[async_trait]
impl IndexerClient for FakeIndexer {
    async fn search(&self, _title: &str, _year: Option<u16>, _season: Option<u32>) -> Result<Vec<Release>, PipelineError> {
        Ok(self.0.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct FakeTorrents;
#[async_trait]
impl TorrentClient for FakeTorrents {
    async fn find_existing(&self, _title: &str, _year: Option<u16>, _season: Option<u32>) -> Result<Option<ExistingTorrent>, PipelineError> {
        Ok(None)
    }
    async fn add(&self, _download_url: &str, _torrent_hash: &str) -> Result<(), PipelineError> {
        Ok(())
    }
    async fn progress(&self, _torrent_hash: &str) -> Result<Option<u8>, PipelineError> {
        Ok(None)
    }
    async fn content_path(&self, _torrent_hash: &str) -> Result<Option<String>, PipelineError> {
        Ok(None)
    }
}

/// Always reports the destination as absent and the transfer as successful —
/// the scenarios below care about request/item state transitions, not the
/// transport's own retry behaviour (that is covered by `deliver.rs`'s unit
/// tests).
#[derive(Default)]
struct AlwaysDeliversTransport;
#[async_trait]
impl DeliveryTransport for AlwaysDeliversTransport {
    async fn transfer(
        &self,
        _server_id: ServerId,
        _source_path: &str,
        _destination_path: &str,
        on_progress: Box<dyn Fn(u8) + Send + Sync>,
    ) -> Result<(), PipelineError> {
        on_progress(100);
        Ok(())
    }
    async fn exists(&self, _server_id: ServerId, _destination_path: &str) -> Result<bool, PipelineError> {
        Ok(false)
    }
    async fn request_library_scan(&self, _server_id: ServerId) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[derive(Default)]
struct FakeNotifications;
#[async_trait]
impl NotificationSink for FakeNotifications {
    async fn notify(&self, _subject: &str, _body: &str) -> Result<(), PipelineError> {
        Ok(())
    }
}

#[derive(Default)]
struct FakeDispatch;
#[async_trait]
impl EncoderDispatchPort for FakeDispatch {
    async fn cancel_job(&self, _assignment_id: EncoderAssignmentId) -> Result<(), PipelineError> {
        Ok(())
    }
}

struct FixedClock;
impl Clock for FixedClock {
    fn now(&self) -> chrono::DateTime<Utc> {
        Utc::now()
    }
}

/// The handles a scenario needs to reach into application state that
/// `Application` itself doesn't expose an accessor for (the orchestrator's
/// own `create_request`/`retry`/etc. cover the rest).
struct Harness {
    app: Application,
    requests: Arc<FakeRequests>,
    items: Arc<FakeItems>,
    assignments: Arc<FakeAssignments>,
    library: Arc<FakeLibrary>,
    indexer: Arc<FakeIndexer>,
}

fn build_harness(kind: MediaKind) -> Harness {
    let requests = Arc::new(FakeRequests::default());
    let items = Arc::new(FakeItems::default());
    let templates = Arc::new(FakeTemplates::default());
    let assignments = Arc::new(FakeAssignments::default());
    let library = Arc::new(FakeLibrary::default());
    let indexer = Arc::new(FakeIndexer::default());

    let repositories = Repositories {
        requests: requests.clone(),
        items: items.clone(),
        templates: templates.clone(),
        executions: Arc::new(FakeExecutions::default()),
        assignments: assignments.clone(),
        breakers: Arc::new(FakeBreakers::default()),
        downloads: Arc::new(FakeDownloads::default()),
        activity_log: Arc::new(FakeLog::default()),
        library: library.clone(),
    };
    let collaborators = Collaborators {
        indexer: indexer.clone(),
        torrents: Arc::new(FakeTorrents),
        transport: Arc::new(AlwaysDeliversTransport),
        notifications: Arc::new(FakeNotifications),
        dispatch: Arc::new(FakeDispatch),
        clock: Arc::new(FixedClock),
    };
    let config = EngineConfig {
        default_quality_target: QualityTarget { min_resolution: Resolution::R1080p, max_resolution: None, preferred_codec: None },
        naming: NamingConfig { movies_root: "/media/movies".into(), tv_root: "/media/tv".into() },
        default_max_attempts: 3,
        channel_depth: 32,
        tv_continuation_delay: Duration::from_millis(1),
        download_recovery_interval: Duration::from_secs(3600),
        encoder_monitor_interval: Duration::from_secs(3600),
        stuck_item_recovery_interval: Duration::from_secs(3600),
        retry_backoff_interval: Duration::from_secs(3600),
        breaker: BreakerConfig::default(),
    };

    let template = PipelineTemplate::default_linear(kind).unwrap();
    *templates.0.lock().unwrap() = Some(template);

    let app = Application::new(repositories, collaborators, config);
    Harness { app, requests, items, assignments, library, indexer }
}

fn release(resolution: Resolution) -> Release {
    Release {
        title: "Inception".into(),
        resolution,
        codec: Codec::H264,
        seeders: 50,
        size_bytes: 4_000_000_000,
        publish_date: Utc::now(),
        download_url: "magnet:?xt=urn:btih:e2e0001".into(),
    }
}

async fn wait_until(mut predicate: impl FnMut() -> bool) {
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(predicate(), "condition never became true within the test's patience budget");
}

fn sole_item(items: &FakeItems, request_id: RequestId) -> ProcessingItem {
    items.0.lock().unwrap().values().find(|i| i.request_id == request_id).cloned().expect("item for request")
}

/// Drives an item paused in `downloading` to `downloaded` the way a real
/// torrent-completion collaborator would: posts `DownloadCompleted` and waits
/// for the executor to fold it in and advance to the encode step's pause.
async fn complete_download(resume: &ResumeSender, item_id: ProcessingItemId, source_file_path: &str) {
    resume.send(PipelineEvent::DownloadCompleted { item_id, source_file_path: source_file_path.to_string() }).await.unwrap();
}

/// Drives an item paused in `encoding` to `encoded` the way the encoder
/// dispatch fabric's own `job:complete` handling would: inserts a completed
/// `EncoderAssignment` row for the item's existing assignment and posts
/// `EncodeCompleted`.
async fn complete_encode(harness: &Harness, resume: &ResumeSender, item_id: ProcessingItemId) {
    let assignment = harness
        .assignments
        .0
        .lock()
        .unwrap()
        .values()
        .find(|a| a.job_id == item_id)
        .cloned()
        .expect("encode step should have created an assignment before pausing");
    resume.send(PipelineEvent::EncodeCompleted { item_id, assignment_id: assignment.id }).await.unwrap();
}

// ---------------------------------------------------------------------------
// Scenario 1 (§8): happy movie — walks pending through completed exactly
// once, with one LibraryItem row recorded on the sole target server.
// ---------------------------------------------------------------------------
#[tokio::test]
async fn happy_movie_completes_end_to_end() {
    let harness = build_harness(MediaKind::Movie);
    harness.indexer.0.lock().unwrap().push(release(Resolution::R1080p));
    let resume = harness.app.resume_sender();

    let server = ServerId::new();
    let request = Request::new_movie("27205", "Inception", 2010, vec![server]);
    let request = harness.app.orchestrator.create_request(request).await.unwrap();

    // Search met quality synchronously; download step pauses waiting for the
    // torrent collaborator.
    let item = sole_item(&harness.items, request.id);
    assert_eq!(item.status, ProcessingStatus::Downloading);

    complete_download(&resume, item.id, "/downloads/inception.mkv").await;
    wait_until(|| sole_item(&harness.items, request.id).status == ProcessingStatus::Encoding).await;

    complete_encode(&harness, &resume, item.id).await;
    wait_until(|| sole_item(&harness.items, request.id).status == ProcessingStatus::Completed).await;

    let final_request = harness.requests.0.lock().unwrap().get(&request.id).cloned().unwrap();
    assert_eq!(final_request.status, RequestStatus::Completed);
    assert_eq!(final_request.progress, 100);

    let completed = harness.assignments.0.lock().unwrap().values().filter(|a| a.job_id == item.id).count();
    assert_eq!(completed, 1, "exactly one EncoderAssignment should exist for the item's single input file");

    assert_eq!(harness.library.0.lock().unwrap().len(), 1, "exactly one LibraryItem row on the sole target server");

    harness.app.shutdown().await;
}

// ---------------------------------------------------------------------------
// Scenario 5 (§8): quality gate — only a lower-resolution release exists, the
// request pauses as `quality_unavailable`, and `acceptLowerQuality` resumes
// the pipeline with that release selected.
// ---------------------------------------------------------------------------
#[tokio::test]
async fn quality_gate_pauses_then_resumes_on_acceptance() {
    let harness = build_harness(MediaKind::Movie);
    harness.indexer.0.lock().unwrap().push(release(Resolution::R720p));
    let resume = harness.app.resume_sender();

    let request = Request::new_movie("27205", "Inception", 2010, vec![ServerId::new()]);
    let request = harness.app.orchestrator.create_request(request).await.unwrap();

    let paused_request = harness.requests.0.lock().unwrap().get(&request.id).cloned().unwrap();
    assert_eq!(paused_request.status, RequestStatus::QualityUnavailable);
    assert_eq!(sole_item(&harness.items, request.id).status, ProcessingStatus::Searching);

    harness.app.orchestrator.accept_lower_quality(request.id, 0).await.unwrap();

    let resumed_request = harness.requests.0.lock().unwrap().get(&request.id).cloned().unwrap();
    assert_eq!(resumed_request.status, RequestStatus::Processing);

    // Resuming the search step with the accepted release re-enters the
    // executor loop and reaches the download step's pause synchronously.
    let item = sole_item(&harness.items, request.id);
    assert_eq!(item.status, ProcessingStatus::Downloading);

    // Drain the rest of the pipeline the same way the happy-path scenario
    // does, to confirm accepting a lower quality doesn't strand the item.
    complete_download(&resume, item.id, "/downloads/inception.mkv").await;
    wait_until(|| sole_item(&harness.items, request.id).status == ProcessingStatus::Encoding).await;
    complete_encode(&harness, &resume, item.id).await;
    wait_until(|| sole_item(&harness.items, request.id).status == ProcessingStatus::Completed).await;

    harness.app.shutdown().await;
}

// ---------------------------------------------------------------------------
// Scenario 4 (§8): partial TV season — of two requested episodes, one
// completes delivery while the other is still mid-pipeline; the request must
// not reach `completed` until both do, and the completed episode's delivery
// must not regress the other's progress.
// ---------------------------------------------------------------------------
#[tokio::test]
async fn tv_request_stays_processing_until_every_episode_is_terminal_positive() {
    let harness = build_harness(MediaKind::Tv);
    harness.indexer.0.lock().unwrap().push(release(Resolution::R1080p));
    let resume = harness.app.resume_sender();

    let request = Request::new_tv("1399", "Game of Thrones", 2011, vec![(1, 1), (1, 2)], vec![ServerId::new()]);
    let request = harness.app.orchestrator.create_request(request).await.unwrap();

    let episodes = harness.items.0.lock().unwrap().values().filter(|i| i.request_id == request.id).cloned().collect::<Vec<_>>();
    assert_eq!(episodes.len(), 2);

    let first = episodes[0].clone();
    let second = episodes[1].clone();

    // Drive only the first episode all the way to completion.
    complete_download(&resume, first.id, "/downloads/got.s01e01.mkv").await;
    wait_until(|| harness.items.0.lock().unwrap().get(&first.id).unwrap().status == ProcessingStatus::Encoding).await;
    complete_encode(&harness, &resume, first.id).await;
    wait_until(|| harness.items.0.lock().unwrap().get(&first.id).unwrap().status == ProcessingStatus::Completed).await;

    // The request as a whole must still be non-terminal: the second episode
    // hasn't moved past its own download pause.
    let mid_request = harness.requests.0.lock().unwrap().get(&request.id).cloned().unwrap();
    assert_ne!(mid_request.status, RequestStatus::Completed);
    assert_eq!(harness.items.0.lock().unwrap().get(&second.id).unwrap().status, ProcessingStatus::Downloading);

    // Finish the second episode too; only now should the request complete
    // (invariant 6).
    complete_download(&resume, second.id, "/downloads/got.s01e02.mkv").await;
    wait_until(|| harness.items.0.lock().unwrap().get(&second.id).unwrap().status == ProcessingStatus::Encoding).await;
    complete_encode(&harness, &resume, second.id).await;
    wait_until(|| harness.items.0.lock().unwrap().get(&second.id).unwrap().status == ProcessingStatus::Completed).await;
    wait_until(|| harness.requests.0.lock().unwrap().get(&request.id).unwrap().status == RequestStatus::Completed).await;

    harness.app.shutdown().await;
}

// ---------------------------------------------------------------------------
// Scenario 6 (§8, recovery slice): cancelling a non-terminal item mid-encode
// tells the dispatch fabric to cancel its job and leaves the item cancelled,
// never regressing to an earlier status.
// ---------------------------------------------------------------------------
#[tokio::test]
async fn cancelling_an_item_mid_encode_does_not_regress_its_status() {
    let harness = build_harness(MediaKind::Movie);
    harness.indexer.0.lock().unwrap().push(release(Resolution::R1080p));
    let resume = harness.app.resume_sender();

    let request = Request::new_movie("27205", "Inception", 2010, vec![ServerId::new()]);
    let request = harness.app.orchestrator.create_request(request).await.unwrap();
    let item = sole_item(&harness.items, request.id);

    complete_download(&resume, item.id, "/downloads/inception.mkv").await;
    wait_until(|| sole_item(&harness.items, request.id).status == ProcessingStatus::Encoding).await;

    harness.app.orchestrator.cancel_item(item.id).await.unwrap();

    let cancelled = sole_item(&harness.items, request.id);
    assert_eq!(cancelled.status, ProcessingStatus::Cancelled);

    harness.app.shutdown().await;
}
