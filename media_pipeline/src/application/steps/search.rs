// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Search Step (§4.3)
//!
//! Checks for an already-complete matching torrent first (§4.3a), short-
//! circuiting straight to `encode` only when its resolution meets the
//! strictest target; a lower-resolution leftover falls through to the
//! indexer query like there were no existing download at all. Otherwise
//! queries the indexer and ranks/partitions the results against a quality
//! target. A single configured `QualityTarget` stands in for the
//! per-delivery-target minimums spec.md leaves open — see DESIGN.md.

use async_trait::async_trait;
use serde_json::Value;

use media_pipeline_domain::entities::pipeline_template::StepType;
use media_pipeline_domain::ports::{IndexerClient, RequestRepository, TorrentClient};
use media_pipeline_domain::step::{Step, StepExecutionInput};
use media_pipeline_domain::value_objects::release::{rank_releases, QualityTarget};
use media_pipeline_domain::value_objects::request_status::RequestStatus;
use media_pipeline_domain::value_objects::step_output::StepOutput;
use media_pipeline_domain::PipelineError;

use crate::application::circuit_breaker_service::CircuitBreakerService;

pub struct SearchStep {
    requests: std::sync::Arc<dyn RequestRepository>,
    indexer: std::sync::Arc<dyn IndexerClient>,
    torrents: std::sync::Arc<dyn TorrentClient>,
    breakers: std::sync::Arc<CircuitBreakerService>,
    default_target: QualityTarget,
}

impl SearchStep {
    pub fn new(
        requests: std::sync::Arc<dyn RequestRepository>,
        indexer: std::sync::Arc<dyn IndexerClient>,
        torrents: std::sync::Arc<dyn TorrentClient>,
        breakers: std::sync::Arc<CircuitBreakerService>,
        default_target: QualityTarget,
    ) -> Self {
        Self { requests, indexer, torrents, breakers, default_target }
    }
}

fn season_of(input: &StepExecutionInput) -> Option<u32> {
    input.context.extra.get("season").and_then(|v| v.as_u64()).map(|v| v as u32)
}

#[async_trait]
impl Step for SearchStep {
    fn step_type(&self) -> StepType {
        StepType::Search
    }

    fn validate_config(&self, _config: &Value) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn execute(&self, input: &StepExecutionInput, _config: &Value) -> Result<StepOutput, PipelineError> {
        let request = self.requests.get(input.request_id).await?;
        let season = season_of(input);
        let mut context = input.context.clone();

        let existing = self.breakers.guard("torrent", || self.torrents.find_existing(&request.title, Some(request.year), season)).await?;
        if let Some(existing) = existing.filter(|e| e.resolution >= self.default_target.min_resolution) {
            context.search.existing_download = Some(media_pipeline_domain::context::ExistingDownload {
                download_id: existing.download_id.to_string(),
                source_file_path: existing.source_file_path.clone(),
            });
            context.download.source_file_path = Some(existing.source_file_path);
            return Ok(StepOutput {
                success: true,
                next_step: Some(Some("encode".to_string())),
                data: Some(context.as_json()),
                ..Default::default()
            });
        }

        let releases = self.breakers.guard("indexer", || self.indexer.search(&request.title, Some(request.year), season)).await?;
        let ranked = rank_releases(releases, &self.default_target);

        if ranked.meets_quality.is_empty() && ranked.alternatives.is_empty() {
            return Ok(StepOutput::retry("no releases found"));
        }

        if let Some(best) = ranked.meets_quality.first().cloned() {
            context.search.selected_release = Some(best);
            context.search.available_releases = ranked.meets_quality;
            Ok(StepOutput::ok_with_data(context.as_json()))
        } else {
            context.search.available_releases = ranked.alternatives.clone();
            let mut req = request;
            req.available_releases = ranked.alternatives;
            req.set_status(RequestStatus::QualityUnavailable);
            self.requests.save(&req).await?;
            Ok(StepOutput { success: true, should_pause: true, data: Some(context.as_json()), ..Default::default() }.paused_without_next())
        }
    }
}
