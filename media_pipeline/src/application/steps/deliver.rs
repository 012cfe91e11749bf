// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Deliver Step (§4.6)
//!
//! Transfers every encoded file to its target servers, skipping servers
//! where the destination already exists (recovery), upserts a `LibraryItem`
//! record and requests a library scan on each one delivery succeeds on, and
//! cleans up the encoded temp files once every transfer succeeded.
//!
//! **Success policy.** §9's open question is resolved as tightened: the
//! outer `success` always respects `requireAllServersSuccess` (default
//! `true`) rather than the source's `deliveredServers.length > 0` quirk — if
//! it is `true` and any server failed, this returns `success=false,
//! shouldRetry=true`.
//!
//! **Request completion.** After a successful delivery, invariant 6's
//! monotone function of sibling item statuses ([`Request::tv_completion_status`])
//! decides the request's new status — this applies to a movie's lone item
//! exactly as it does to a TV show's episodes. For TV, any remaining
//! non-terminal-positive sibling episode items mean the request goes back to
//! `pending` and a [`PipelineEvent::TvContinuationDue`] is raised after a
//! short delay so the application root can re-drive them (§4.6, §9 — the
//! delay itself is documented as tunable, not load-bearing).

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use media_pipeline_domain::entities::pipeline_template::StepType;
use media_pipeline_domain::entities::LibraryItem;
use media_pipeline_domain::ports::{DeliveryTransport, LibraryItemRepository, ProcessingItemRepository, RequestRepository};
use media_pipeline_domain::step::{Step, StepExecutionInput};
use media_pipeline_domain::value_objects::ids::ServerId;
use media_pipeline_domain::value_objects::media_kind::MediaKind;
use media_pipeline_domain::value_objects::processing_status::ProcessingStatus;
use media_pipeline_domain::value_objects::request_status::RequestStatus;
use media_pipeline_domain::value_objects::step_output::StepOutput;
use media_pipeline_domain::PipelineError;

use crate::application::circuit_breaker_service::CircuitBreakerService;
use crate::application::events::{PipelineEvent, ResumeSender};
use crate::application::naming::{destination_path, DeliveryTarget, NamingConfig};

fn default_require_all_servers_success() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
struct DeliverConfig {
    #[serde(default = "default_require_all_servers_success")]
    require_all_servers_success: bool,
}

pub struct DeliverStep {
    requests: Arc<dyn RequestRepository>,
    items: Arc<dyn ProcessingItemRepository>,
    library: Arc<dyn LibraryItemRepository>,
    transport: Arc<dyn DeliveryTransport>,
    breakers: Arc<CircuitBreakerService>,
    naming: NamingConfig,
    resume: ResumeSender,
    continuation_delay: Duration,
}

impl DeliverStep {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        items: Arc<dyn ProcessingItemRepository>,
        library: Arc<dyn LibraryItemRepository>,
        transport: Arc<dyn DeliveryTransport>,
        breakers: Arc<CircuitBreakerService>,
        naming: NamingConfig,
        resume: ResumeSender,
        continuation_delay: Duration,
    ) -> Self {
        Self { requests, items, library, transport, breakers, naming, resume, continuation_delay }
    }

    async fn finalize_request_completion(&self, request: &mut media_pipeline_domain::entities::Request, input: &StepExecutionInput) -> Result<(), PipelineError> {
        let siblings = self.items.list_by_request(input.request_id).await?;
        // The item this call is delivering hasn't had its own `completed`
        // write land yet — the executor only applies it once `execute`
        // returns (`synchronous_exit_status`) — so substitute it here rather
        // than read its still-`delivering` persisted status.
        let statuses: Vec<_> =
            siblings.iter().map(|item| if item.id == input.item_id { ProcessingStatus::Completed } else { item.status }).collect();
        let outcome = media_pipeline_domain::entities::Request::tv_completion_status(&statuses);

        request.set_status(outcome);
        if outcome == RequestStatus::Completed {
            request.progress = 100;
        }
        self.requests.save(request).await?;

        if outcome != RequestStatus::Completed && statuses.iter().any(|s| !s.is_terminal_positive()) {
            let resume = self.resume.clone();
            let request_id = input.request_id;
            let delay = self.continuation_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = resume.send(PipelineEvent::TvContinuationDue { request_id }).await;
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Step for DeliverStep {
    fn step_type(&self) -> StepType {
        StepType::Deliver
    }

    fn validate_config(&self, config: &Value) -> Result<(), PipelineError> {
        serde_json::from_value::<DeliverConfig>(config.clone()).map(|_| ()).map_err(|e| PipelineError::ConfigError(e.to_string()))
    }

    async fn execute(&self, input: &StepExecutionInput, config: &Value) -> Result<StepOutput, PipelineError> {
        let cfg: DeliverConfig = serde_json::from_value(config.clone()).map_err(|e| PipelineError::ConfigError(e.to_string()))?;
        let mut request = self.requests.get(input.request_id).await?;
        let mut context = input.context.clone();

        if context.encode.encoded_files.is_empty() {
            return Ok(StepOutput::fail("deliver step reached with no encoded files"));
        }

        let mut delivered = Vec::new();
        let mut recovered = Vec::new();
        let mut failed = Vec::new();
        let progress = Arc::new(AtomicU8::new(request.progress.max(75)));

        for file in context.encode.encoded_files.clone() {
            let targets: Vec<ServerId> = if file.target_server_ids.is_empty() {
                request.targets.clone()
            } else {
                file.target_server_ids.iter().filter_map(|s| s.parse().ok()).collect()
            };

            let extension = file.path.rsplit('.').next().unwrap_or("mkv").to_string();
            let destination = destination_path(
                &self.naming,
                request.kind,
                &DeliveryTarget {
                    title: &request.title,
                    year: request.year,
                    tmdb_id: &request.external_id,
                    resolution: parse_resolution(&file.resolution),
                    codec: parse_codec(&file.codec),
                    extension: &extension,
                    season: file.season,
                    episode: file.episode,
                    episode_title: None,
                },
            );
            let quality = format!("{} {}", file.resolution, file.codec);

            for server_id in targets {
                let already_there = self.breakers.guard("delivery", || self.transport.exists(server_id, &destination)).await.unwrap_or(false);
                if already_there {
                    recovered.push(server_id.to_string());
                    continue;
                }

                let source = file.path.clone();
                let dest = destination.clone();
                let progress_cell = progress.clone();
                let on_progress: Box<dyn Fn(u8) + Send + Sync> = Box::new(move |percent| {
                    let scaled = 75u32 + (u32::from(percent) * 20 / 100);
                    progress_cell.store(scaled.min(95) as u8, Ordering::Relaxed);
                });

                let result = self.breakers.guard("delivery", || self.transport.transfer(server_id, &source, &dest, on_progress)).await;
                request.progress = progress.load(Ordering::Relaxed);
                self.requests.save(&request).await?;

                match result {
                    Ok(()) => {
                        let _ = self.breakers.guard("delivery", || self.transport.request_library_scan(server_id)).await;
                        let item = LibraryItem::upsert(&request.external_id, request.kind, server_id, &quality);
                        self.library.upsert(&item).await?;
                        delivered.push(server_id.to_string());
                    }
                    Err(_) => failed.push(server_id.to_string()),
                }
            }
        }

        context.deliver.delivered_servers = delivered.clone();
        context.deliver.failed_servers = failed.clone();
        context.deliver.recovered_servers = recovered.clone();

        let success = if cfg.require_all_servers_success { failed.is_empty() } else { !delivered.is_empty() || !recovered.is_empty() };

        if !success {
            return Ok(StepOutput::retry(format!("delivery failed for servers: {}", failed.join(", "))));
        }

        if failed.is_empty() {
            for file in &context.encode.encoded_files {
                if let Err(err) = tokio::fs::remove_file(&file.path).await {
                    warn!(path = %file.path, %err, "failed to clean up encoded temp file");
                }
            }
        }

        self.finalize_request_completion(&mut request, input).await?;

        Ok(StepOutput::ok_with_data(context.as_json()))
    }
}

fn parse_resolution(tag: &str) -> media_pipeline_domain::value_objects::release::Resolution {
    use media_pipeline_domain::value_objects::release::Resolution::*;
    match tag {
        "480p" => R480p,
        "720p" => R720p,
        "2160p" => R2160p,
        _ => R1080p,
    }
}

fn parse_codec(tag: &str) -> media_pipeline_domain::value_objects::release::Codec {
    use media_pipeline_domain::value_objects::release::Codec::*;
    match tag {
        "h264" => H264,
        "av1" => Av1,
        "hevc" => Hevc,
        _ => Other,
    }
}
