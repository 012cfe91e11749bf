// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Repository & Collaborator Ports
//!
//! Trait boundaries between the engine (C1–C11) and (a) persistence and (b)
//! the external collaborators spec.md §1 declares out of scope. Adapters —
//! sqlx-backed repositories, HTTP indexer/torrent clients, the SFTP/rsync
//! transport — live in the application crate's `infrastructure` module, the
//! same "ports in the domain, adapters outside" split the teacher draws
//! around `FileIOService`/`PipelineRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    ActivityLogEntry, CircuitBreaker, Download, EncoderAssignment, LibraryItem, PipelineExecution, PipelineTemplate,
    ProcessingItem, RemoteEncoder, Request,
};
use crate::error::PipelineError;
use crate::value_objects::assignment_status::AssignmentStatus;
use crate::value_objects::ids::{
    DownloadId, EncoderAssignmentId, EncoderId, PipelineExecutionId, PipelineTemplateId, ProcessingItemId, RequestId,
};
use crate::value_objects::media_kind::MediaKind;
use crate::value_objects::processing_status::ProcessingStatus;

type Result<T> = std::result::Result<T, PipelineError>;

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn save(&self, request: &Request) -> Result<()>;
    async fn get(&self, id: RequestId) -> Result<Request>;
    async fn list_active(&self) -> Result<Vec<Request>>;
}

#[async_trait]
pub trait ProcessingItemRepository: Send + Sync {
    async fn save(&self, item: &ProcessingItem) -> Result<()>;
    async fn get(&self, id: ProcessingItemId) -> Result<ProcessingItem>;
    async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<ProcessingItem>>;
    async fn list_by_status(&self, status: ProcessingStatus) -> Result<Vec<ProcessingItem>>;
    /// Backs `StuckItemRecoveryWorker`'s sub-sweep 3: a raw group-by over
    /// `(requestId, season)` to find seasons with mixed download linkage
    /// (§4.8).
    async fn list_by_request_and_season(&self, request_id: RequestId, season: u32) -> Result<Vec<ProcessingItem>>;
}

#[async_trait]
pub trait PipelineTemplateRepository: Send + Sync {
    async fn save(&self, template: &PipelineTemplate) -> Result<()>;
    async fn get(&self, id: PipelineTemplateId) -> Result<PipelineTemplate>;
    async fn get_default(&self, kind: MediaKind) -> Result<PipelineTemplate>;
}

#[async_trait]
pub trait PipelineExecutionRepository: Send + Sync {
    async fn save(&self, execution: &PipelineExecution) -> Result<()>;
    async fn get(&self, id: PipelineExecutionId) -> Result<PipelineExecution>;
    async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<PipelineExecution>>;
    /// The root + any branch executions currently owning non-terminal work
    /// for an item (invariant 2).
    async fn find_active_by_item(&self, item_id: ProcessingItemId) -> Result<Option<PipelineExecution>>;
}

#[async_trait]
pub trait EncoderAssignmentRepository: Send + Sync {
    async fn save(&self, assignment: &EncoderAssignment) -> Result<()>;
    async fn get(&self, id: EncoderAssignmentId) -> Result<EncoderAssignment>;
    async fn get_by_job_id(&self, job_id: ProcessingItemId) -> Result<Option<EncoderAssignment>>;
    /// Enforces invariant 4: at most one row per `(inputPath, status active)`.
    async fn find_active_by_input_path(&self, input_path: &str) -> Result<Option<EncoderAssignment>>;
    async fn list_pending_oldest_first(&self) -> Result<Vec<EncoderAssignment>>;
    async fn list_by_status(&self, status: AssignmentStatus) -> Result<Vec<EncoderAssignment>>;
    async fn list_by_encoder(&self, encoder_id: EncoderId) -> Result<Vec<EncoderAssignment>>;
}

#[async_trait]
pub trait RemoteEncoderRepository: Send + Sync {
    async fn save(&self, encoder: &RemoteEncoder) -> Result<()>;
    async fn get(&self, id: EncoderId) -> Result<RemoteEncoder>;
    async fn list_all(&self) -> Result<Vec<RemoteEncoder>>;
}

#[async_trait]
pub trait CircuitBreakerRepository: Send + Sync {
    async fn save(&self, breaker: &CircuitBreaker) -> Result<()>;
    async fn get_or_create(&self, service: &str) -> Result<CircuitBreaker>;
}

#[async_trait]
pub trait DownloadRepository: Send + Sync {
    async fn save(&self, download: &Download) -> Result<()>;
    async fn get(&self, id: DownloadId) -> Result<Download>;
    async fn get_by_hash(&self, torrent_hash: &str) -> Result<Option<Download>>;
    async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<Download>>;
}

#[async_trait]
pub trait ActivityLogRepository: Send + Sync {
    async fn append(&self, entry: &ActivityLogEntry) -> Result<()>;
    async fn list_by_request(&self, request_id: RequestId) -> Result<Vec<ActivityLogEntry>>;
}

#[async_trait]
pub trait LibraryItemRepository: Send + Sync {
    async fn upsert(&self, item: &LibraryItem) -> Result<()>;
    async fn get(&self, tmdb_id: &str, kind: MediaKind, server_id: crate::value_objects::ids::ServerId) -> Result<Option<LibraryItem>>;
}

// ---------------------------------------------------------------------------
// Collaborator ports (§1, §6) — out of scope beyond this narrow surface.
// ---------------------------------------------------------------------------

/// A release reported by the indexer collaborator (§4.3b). Mirrors
/// `Release` but is the wire-shaped type the HTTP client deserializes into,
/// kept distinct so indexer response-format drift never leaks past the
/// adapter boundary.
pub use crate::value_objects::release::Release as IndexerRelease;

#[async_trait]
pub trait IndexerClient: Send + Sync {
    async fn search(&self, title: &str, year: Option<u16>, season: Option<u32>) -> Result<Vec<IndexerRelease>>;
}

#[derive(Debug, Clone)]
pub struct ExistingTorrent {
    pub download_id: DownloadId,
    pub resolution: crate::value_objects::release::Resolution,
    pub source_file_path: String,
}

#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// §4.3a: an already-present completed download whose parsed metadata
    /// matches (normalised title, year for movies, season for TV).
    async fn find_existing(&self, title: &str, year: Option<u16>, season: Option<u32>) -> Result<Option<ExistingTorrent>>;
    async fn add(&self, download_url: &str, torrent_hash: &str) -> Result<()>;
    /// Percent complete in `[0,100]`, `None` if the torrent isn't known.
    async fn progress(&self, torrent_hash: &str) -> Result<Option<u8>>;
    /// Root content path once the torrent is complete (directory or file).
    async fn content_path(&self, torrent_hash: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Transfers `source_path` to `server_id`'s `destination_path`, invoking
    /// `on_progress(percent)` as the transfer advances (§4.6).
    async fn transfer(
        &self,
        server_id: crate::value_objects::ids::ServerId,
        source_path: &str,
        destination_path: &str,
        on_progress: Box<dyn Fn(u8) + Send + Sync>,
    ) -> Result<()>;
    async fn exists(&self, server_id: crate::value_objects::ids::ServerId, destination_path: &str) -> Result<bool>;
    async fn request_library_scan(&self, server_id: crate::value_objects::ids::ServerId) -> Result<()>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> Result<()>;
}

/// The orchestrator's (C6) narrow view of the encoder dispatch fabric (C9):
/// `cancelItem` needs to tell a connected encoder to abandon an in-flight
/// job (`job:cancel`, §4.5/§4.7) without the orchestrator owning the whole
/// worker connection table.
#[async_trait]
pub trait EncoderDispatchPort: Send + Sync {
    async fn cancel_job(&self, assignment_id: EncoderAssignmentId) -> Result<()>;
}

/// When `now` is omitted by a caller that has no reason to fake the clock,
/// both the domain and application layers read it through this port so
/// tests can inject a fixed instant instead of sleeping (e.g. the stall
/// detector's 120s/240s thresholds, §4.5).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
