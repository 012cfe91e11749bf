// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Download Step (§4.4)
//!
//! Adds the selected release to the torrent client, keyed by torrent hash
//! for idempotent re-adds, then pauses. Completion is not observed by
//! re-invoking this step — `DownloadRecoveryWorker` and
//! `StuckItemRecoveryWorker` (C7) both resolve the pause directly by
//! transitioning the item and resuming the execution, since `TorrentClient`
//! is poll-only with no push callback (§9 open question). When a prior,
//! already-complete download is found under the same hash, its content
//! path is resolved down to one concrete video file here before the step
//! reports success — see `media_selection`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde_json::Value;

use media_pipeline_domain::entities::pipeline_template::StepType;
use media_pipeline_domain::entities::Download;
use media_pipeline_domain::ports::{DownloadRepository, ProcessingItemRepository, RequestRepository, TorrentClient};
use media_pipeline_domain::step::{Step, StepExecutionInput};
use media_pipeline_domain::value_objects::step_output::StepOutput;
use media_pipeline_domain::PipelineError;

use crate::application::circuit_breaker_service::CircuitBreakerService;
use crate::application::media_selection::select_video_file;

pub struct DownloadStep {
    requests: std::sync::Arc<dyn RequestRepository>,
    downloads: std::sync::Arc<dyn DownloadRepository>,
    items: std::sync::Arc<dyn ProcessingItemRepository>,
    torrents: std::sync::Arc<dyn TorrentClient>,
    breakers: std::sync::Arc<CircuitBreakerService>,
}

impl DownloadStep {
    pub fn new(
        requests: std::sync::Arc<dyn RequestRepository>,
        downloads: std::sync::Arc<dyn DownloadRepository>,
        items: std::sync::Arc<dyn ProcessingItemRepository>,
        torrents: std::sync::Arc<dyn TorrentClient>,
        breakers: std::sync::Arc<CircuitBreakerService>,
    ) -> Self {
        Self { requests, downloads, items, torrents, breakers }
    }
}

/// `btih` out of a magnet link when present; otherwise a stable hash of the
/// whole URL. Either way the result is a fixed idempotency key for the same
/// release, which is all the download step needs it for.
fn torrent_hash(download_url: &str) -> String {
    if let Some(start) = download_url.find("btih:") {
        let rest = &download_url[start + 5..];
        let end = rest.find('&').unwrap_or(rest.len());
        return rest[..end].to_lowercase();
    }
    let mut hasher = DefaultHasher::new();
    download_url.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

#[async_trait]
impl Step for DownloadStep {
    fn step_type(&self) -> StepType {
        StepType::Download
    }

    fn validate_config(&self, _config: &Value) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn execute(&self, input: &StepExecutionInput, _config: &Value) -> Result<StepOutput, PipelineError> {
        let request = self.requests.get(input.request_id).await?;
        let mut context = input.context.clone();

        let Some(release) = context.search.selected_release.clone() else {
            return Ok(StepOutput::fail("download step reached with no selected release"));
        };

        let hash = torrent_hash(&release.download_url);

        if let Some(existing) = self.downloads.get_by_hash(&hash).await? {
            if existing.is_complete() {
                let Some(content_path) = existing.content_path.clone() else {
                    return Ok(StepOutput::fail("download marked complete with no content path recorded"));
                };
                let item = self.items.get(input.item_id).await?;
                let episode = item.episode.map(|ep| (item.season.unwrap_or(1), ep));
                let video = match select_video_file(&content_path, episode).await {
                    Ok(path) => path,
                    Err(err) => return Ok(StepOutput::fail(format!("no video file found in completed download: {err}"))),
                };
                context.download.torrent_hash = Some(hash.clone());
                context.download.source_file_path = Some(video);
                return Ok(StepOutput::ok_with_data(context.as_json()));
            }
        } else {
            let season = input.context.extra.get("season").and_then(|v| v.as_u64()).map(|v| v as u32);
            let download = Download::new(input.request_id, hash.clone(), &request.title, Some(request.year), season);
            self.downloads.save(&download).await?;
        }

        self.breakers.guard("torrent", || self.torrents.add(&release.download_url, &hash)).await?;
        context.download.torrent_hash = Some(hash.clone());

        Ok(StepOutput { success: true, should_pause: true, data: Some(context.as_json()), ..Default::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use media_pipeline_domain::entities::{CircuitBreaker, ProcessingItem, Request};
    use media_pipeline_domain::ports::{CircuitBreakerRepository, ExistingTorrent, SystemClock};
    use media_pipeline_domain::value_objects::ids::{PipelineExecutionId, ProcessingItemId, RequestId};
    use media_pipeline_domain::value_objects::release::{Codec, Release, Resolution};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeRequests(Request);
    #[async_trait]
    impl RequestRepository for FakeRequests {
        async fn save(&self, _request: &Request) -> Result<(), PipelineError> {
            Ok(())
        }
        async fn get(&self, _id: RequestId) -> Result<Request, PipelineError> {
            Ok(self.0.clone())
        }
        async fn list_active(&self) -> Result<Vec<Request>, PipelineError> {
            Ok(vec![])
        }
    }

    #[derive(Default)]
    struct FakeDownloads(Mutex<Vec<Download>>);
    #[async_trait]
    impl DownloadRepository for FakeDownloads {
        async fn save(&self, download: &Download) -> Result<(), PipelineError> {
            self.0.lock().unwrap().push(download.clone());
            Ok(())
        }
        async fn get(&self, id: media_pipeline_domain::value_objects::ids::DownloadId) -> Result<Download, PipelineError> {
            self.0.lock().unwrap().iter().find(|d| d.id == id).cloned().ok_or_else(|| PipelineError::not_found(format!("download {id}")))
        }
        async fn get_by_hash(&self, torrent_hash: &str) -> Result<Option<Download>, PipelineError> {
            Ok(self.0.lock().unwrap().iter().find(|d| d.torrent_hash == torrent_hash).cloned())
        }
        async fn list_by_request(&self, _request_id: RequestId) -> Result<Vec<Download>, PipelineError> {
            Ok(vec![])
        }
    }

    struct FakeItems(Mutex<ProcessingItem>);
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
        async fn list_by_status(&self, _status: media_pipeline_domain::value_objects::processing_status::ProcessingStatus) -> Result<Vec<ProcessingItem>, PipelineError> {
            Ok(vec![])
        }
        async fn list_by_request_and_season(&self, _request_id: RequestId, _season: u32) -> Result<Vec<ProcessingItem>, PipelineError> {
            Ok(vec![])
        }
    }

    struct FakeTorrents(Mutex<Vec<String>>);
    #[async_trait]
    impl TorrentClient for FakeTorrents {
        async fn find_existing(&self, _title: &str, _year: Option<u16>, _season: Option<u32>) -> Result<Option<ExistingTorrent>, PipelineError> {
            Ok(None)
        }
        async fn add(&self, download_url: &str, _torrent_hash: &str) -> Result<(), PipelineError> {
            self.0.lock().unwrap().push(download_url.to_string());
            Ok(())
        }
        async fn progress(&self, _torrent_hash: &str) -> Result<Option<u8>, PipelineError> {
            Ok(None)
        }
        async fn content_path(&self, _torrent_hash: &str) -> Result<Option<String>, PipelineError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct InMemoryBreakerRepo(Mutex<HashMap<String, CircuitBreaker>>);
    #[async_trait]
    impl CircuitBreakerRepository for InMemoryBreakerRepo {
        async fn save(&self, breaker: &CircuitBreaker) -> Result<(), PipelineError> {
            self.0.lock().unwrap().insert(breaker.service.clone(), breaker.clone());
            Ok(())
        }
        async fn get_or_create(&self, service: &str) -> Result<CircuitBreaker, PipelineError> {
            Ok(self.0.lock().unwrap().entry(service.to_string()).or_insert_with(|| CircuitBreaker::new(service, Default::default())).clone())
        }
    }

    fn input_with_release() -> StepExecutionInput {
        let mut context = media_pipeline_domain::context::ProcessingContext::new();
        context.search.selected_release = Some(Release {
            title: "Inception".into(),
            resolution: Resolution::R1080p,
            codec: Codec::H264,
            seeders: 10,
            size_bytes: 1,
            publish_date: Utc::now(),
            download_url: "magnet:?xt=urn:btih:DEADBEEF".into(),
        });
        StepExecutionInput {
            request_id: RequestId::new(),
            item_id: ProcessingItemId::new(),
            execution_id: PipelineExecutionId::new(),
            context,
        }
    }

    fn breakers() -> std::sync::Arc<CircuitBreakerService> {
        std::sync::Arc::new(CircuitBreakerService::new(std::sync::Arc::new(InMemoryBreakerRepo::default()), std::sync::Arc::new(SystemClock), Default::default()))
    }

    #[tokio::test]
    async fn adds_torrent_and_pauses() {
        let requests = std::sync::Arc::new(FakeRequests(Request::new_movie("27205", "Inception", 2010, vec![])));
        let downloads = std::sync::Arc::new(FakeDownloads::default());
        let items = std::sync::Arc::new(FakeItems(Mutex::new(ProcessingItem::new_movie(RequestId::new(), 3))));
        let torrents = std::sync::Arc::new(FakeTorrents(Mutex::new(vec![])));

        let step = DownloadStep::new(requests, downloads.clone(), items, torrents.clone(), breakers());
        let out = step.execute(&input_with_release(), &Value::Null).await.unwrap();

        assert!(out.should_pause);
        assert_eq!(downloads.0.lock().unwrap().len(), 1);
        assert_eq!(torrents.0.lock().unwrap().len(), 1);
        assert_eq!(out.data.unwrap()["download"]["torrent_hash"], "deadbeef");
    }

    #[tokio::test]
    async fn completed_existing_download_resolves_to_the_largest_movie_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sample.mkv"), vec![0u8; 10]).unwrap();
        std::fs::write(dir.path().join("inception.mkv"), vec![0u8; 1000]).unwrap();

        let requests = std::sync::Arc::new(FakeRequests(Request::new_movie("27205", "Inception", 2010, vec![])));
        let mut existing = Download::new(RequestId::new(), "deadbeef".to_string(), "Inception", Some(2010), None);
        existing.content_path = Some(dir.path().to_str().unwrap().to_string());
        existing.state = media_pipeline_domain::entities::DownloadState::Completed;
        existing.percent_complete = 100;
        let downloads = std::sync::Arc::new(FakeDownloads(Mutex::new(vec![existing])));
        let items = std::sync::Arc::new(FakeItems(Mutex::new(ProcessingItem::new_movie(RequestId::new(), 3))));
        let torrents = std::sync::Arc::new(FakeTorrents(Mutex::new(vec![])));

        let step = DownloadStep::new(requests, downloads, items, torrents, breakers());
        let out = step.execute(&input_with_release(), &Value::Null).await.unwrap();

        assert!(out.success);
        assert!(!out.should_pause);
        let path = out.data.unwrap()["download"]["source_file_path"].as_str().unwrap().to_string();
        assert!(path.ends_with("inception.mkv"));
    }

    #[tokio::test]
    async fn completed_existing_download_with_no_video_hard_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), vec![0u8; 10]).unwrap();

        let requests = std::sync::Arc::new(FakeRequests(Request::new_movie("27205", "Inception", 2010, vec![])));
        let mut existing = Download::new(RequestId::new(), "deadbeef".to_string(), "Inception", Some(2010), None);
        existing.content_path = Some(dir.path().to_str().unwrap().to_string());
        existing.state = media_pipeline_domain::entities::DownloadState::Completed;
        existing.percent_complete = 100;
        let downloads = std::sync::Arc::new(FakeDownloads(Mutex::new(vec![existing])));
        let items = std::sync::Arc::new(FakeItems(Mutex::new(ProcessingItem::new_movie(RequestId::new(), 3))));
        let torrents = std::sync::Arc::new(FakeTorrents(Mutex::new(vec![])));

        let step = DownloadStep::new(requests, downloads, items, torrents, breakers());
        let out = step.execute(&input_with_release(), &Value::Null).await.unwrap();

        assert!(!out.success);
        assert!(!out.should_retry);
    }
}
