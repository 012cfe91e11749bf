// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Orchestrator Façade (C6, §4.7, §6)
//!
//! The only entry point the CLI/HTTP/UI surface (§6) calls into: every public
//! method here is one transactional mutation — `createRequest`, `cancel`,
//! `retry`, `retryItem`, `cancelItem`, `acceptLowerQuality`,
//! `approveDiscoveredItem`, `overrideDiscoveredRelease` — that either succeeds
//! outright or returns a typed [`PipelineError`]. `ProcessingItem.status` is
//! still only ever written through [`transitions::transition_item_status`];
//! this module adds the request-level and resume-event-driven orchestration
//! around that single writer, it does not bypass it.

use std::sync::Arc;

use media_pipeline_domain::entities::pipeline_execution::ExecutionStatus;
use media_pipeline_domain::entities::{PipelineExecution, ProcessingItem, Request};
use media_pipeline_domain::ports::{
    ActivityLogRepository, EncoderDispatchPort, PipelineExecutionRepository, PipelineTemplateRepository,
    ProcessingItemRepository, RequestRepository,
};
use media_pipeline_domain::value_objects::ids::{ProcessingItemId, RequestId};
use media_pipeline_domain::value_objects::media_kind::MediaKind;
use media_pipeline_domain::value_objects::processing_status::ProcessingStatus;
use media_pipeline_domain::value_objects::release::Release;
use media_pipeline_domain::value_objects::request_status::RequestStatus;
use media_pipeline_domain::PipelineError;

use crate::application::executor::Executor;
use crate::application::transitions::{transition_item_status, StatusPatch};

pub struct Orchestrator {
    requests: Arc<dyn RequestRepository>,
    items: Arc<dyn ProcessingItemRepository>,
    executions: Arc<dyn PipelineExecutionRepository>,
    templates: Arc<dyn PipelineTemplateRepository>,
    activity_log: Arc<dyn ActivityLogRepository>,
    executor: Arc<Executor>,
    dispatch: Arc<dyn EncoderDispatchPort>,
    default_max_attempts: u32,
}

impl Orchestrator {
    pub fn new(
        requests: Arc<dyn RequestRepository>,
        items: Arc<dyn ProcessingItemRepository>,
        executions: Arc<dyn PipelineExecutionRepository>,
        templates: Arc<dyn PipelineTemplateRepository>,
        activity_log: Arc<dyn ActivityLogRepository>,
        executor: Arc<Executor>,
        dispatch: Arc<dyn EncoderDispatchPort>,
        default_max_attempts: u32,
    ) -> Self {
        Self { requests, items, executions, templates, activity_log, executor, dispatch, default_max_attempts }
    }

    /// Persists `request`, builds its `ProcessingItem`s (one for a movie, one
    /// per requested episode for TV), and starts a root execution for each
    /// against the media kind's default template — every episode after the
    /// first hangs off the first as a branch execution, so the tree spec.md's
    /// `parentExecutionId` describes exists from creation, not just after a
    /// recovery sweep reparents it (§3, pipeline_template's module docs).
    pub async fn create_request(&self, mut request: Request) -> Result<Request, PipelineError> {
        request.status = RequestStatus::Processing;
        self.requests.save(&request).await?;

        let template = self.templates.get_default(request.kind).await?;
        let items = self.build_items(&request);

        let mut root: Option<PipelineExecution> = None;
        for item in &items {
            self.items.save(item).await?;
            let execution = match &root {
                None => PipelineExecution::new_root(request.id, template.id, item.id),
                Some(root) => PipelineExecution::new_branch(root, item.id),
            };
            self.executions.save(&execution).await?;
            if root.is_none() {
                root = Some(execution.clone());
            }
            self.executor.run(execution.id).await?;
        }

        Ok(request)
    }

    fn build_items(&self, request: &Request) -> Vec<ProcessingItem> {
        match request.kind {
            MediaKind::Movie => vec![ProcessingItem::new_movie(request.id, self.default_max_attempts)],
            MediaKind::Tv => request
                .requested_episodes
                .iter()
                .map(|(season, episode)| ProcessingItem::new_episode(request.id, *season, *episode, self.default_max_attempts))
                .collect(),
        }
    }

    /// Cancels every non-terminal item under `request_id` and the request
    /// itself. Per-item cancellation (including `C9.cancelJob`) is delegated
    /// to [`Self::cancel_item`] so the two entry points share one rule.
    pub async fn cancel(&self, request_id: RequestId) -> Result<(), PipelineError> {
        let mut request = self.requests.get(request_id).await?;
        for item in self.items.list_by_request(request_id).await? {
            if !item.status.is_terminal() {
                self.cancel_item(item.id).await?;
            }
        }
        request.set_status(RequestStatus::Cancelled);
        self.requests.save(&request).await
    }

    /// Retries every `failed` item under `request_id`.
    pub async fn retry(&self, request_id: RequestId) -> Result<(), PipelineError> {
        let mut request = self.requests.get(request_id).await?;
        for item in self.items.list_by_request(request_id).await? {
            if item.status == ProcessingStatus::Failed {
                self.retry_item(item.id).await?;
            }
        }
        request.set_status(RequestStatus::Processing);
        self.requests.save(&request).await
    }

    /// Requires `failed`, clears attempts/lastError (via the
    /// `failed -> pending` edge `ProcessingItem::apply_transition` already
    /// handles), and starts a fresh root execution against the request's
    /// default template — a retried item's original branch execution may
    /// have belonged to an ephemeral per-episode tree that is gone by now, so
    /// falling back to the default template rather than reusing the old
    /// `templateId` is deliberate (§4.7).
    pub async fn retry_item(&self, item_id: ProcessingItemId) -> Result<(), PipelineError> {
        let item = self.items.get(item_id).await?;
        if item.status != ProcessingStatus::Failed {
            return Err(PipelineError::precondition(format!("item {item_id} is not failed, cannot retry")));
        }

        let updated = transition_item_status(
            self.items.as_ref(),
            self.activity_log.as_ref(),
            item_id,
            ProcessingStatus::Pending,
            StatusPatch::default().with_next_retry_at(None),
        )
        .await?;

        if self.executions.find_active_by_item(item_id).await?.is_none() {
            let request = self.requests.get(updated.request_id).await?;
            let template = self.templates.get_default(request.kind).await?;
            let execution = PipelineExecution::new_root(request.id, template.id, item_id);
            self.executions.save(&execution).await?;
            self.executor.run(execution.id).await?;
        }
        Ok(())
    }

    /// Re-drives a TV request's remaining episode items once a sibling
    /// delivery leaves the request `processing` again (§4.6's continuation
    /// path, following [`PipelineEvent::TvContinuationDue`]): every
    /// non-terminal item without an active execution gets a fresh root
    /// execution against the request's default template, the same fallback
    /// [`Self::retry_item`] uses when an item's original branch execution is
    /// gone.
    pub async fn continue_tv_request(&self, request_id: RequestId) -> Result<(), PipelineError> {
        let request = self.requests.get(request_id).await?;
        let template = self.templates.get_default(request.kind).await?;

        for item in self.items.list_by_request(request_id).await? {
            if item.status.is_terminal() {
                continue;
            }
            if self.executions.find_active_by_item(item.id).await?.is_none() {
                let execution = PipelineExecution::new_root(request.id, template.id, item.id);
                self.executions.save(&execution).await?;
                self.executor.run(execution.id).await?;
            }
        }
        Ok(())
    }

    /// Requires a non-terminal item; transitions it to `cancelled` and, if it
    /// currently owns an encoding job, tells the dispatch fabric to cancel it
    /// (`job:cancel`, §4.5).
    pub async fn cancel_item(&self, item_id: ProcessingItemId) -> Result<(), PipelineError> {
        let item = self.items.get(item_id).await?;
        if item.status.is_terminal() {
            return Err(PipelineError::precondition(format!("item {item_id} is already terminal, cannot cancel")));
        }

        if let Some(assignment_id) = item.encoding_job_id {
            self.dispatch.cancel_job(assignment_id).await?;
        }

        transition_item_status(self.items.as_ref(), self.activity_log.as_ref(), item_id, ProcessingStatus::Cancelled, StatusPatch::default())
            .await?;

        if let Some(mut execution) = self.executions.find_active_by_item(item_id).await? {
            execution.finish(ExecutionStatus::Cancelled);
            self.executions.save(&execution).await?;
        }
        Ok(())
    }

    /// Requires `request.status == quality_unavailable`; picks the caller's
    /// chosen alternative out of the releases stashed on the request by the
    /// search step (§4.3e) by index, and resumes every item of the request
    /// still paused in `searching` with it selected. An out-of-range index
    /// fails rather than silently falling back to the top-ranked one.
    pub async fn accept_lower_quality(&self, request_id: RequestId, index: usize) -> Result<(), PipelineError> {
        let mut request = self.requests.get(request_id).await?;
        if request.status != RequestStatus::QualityUnavailable {
            return Err(PipelineError::precondition(format!("request {request_id} is not awaiting a quality decision")));
        }
        let release = request
            .available_releases
            .get(index)
            .cloned()
            .ok_or_else(|| PipelineError::not_found(format!("no alternative release at index {index} for request {request_id}")))?;

        for item in self.items.list_by_request(request_id).await? {
            if item.status == ProcessingStatus::Searching {
                let release = release.clone();
                self.executor
                    .resume_paused(item.id, move |context| {
                        context.search.selected_release = Some(release);
                    })
                    .await?;
            }
        }

        request.set_status(RequestStatus::Processing);
        self.requests.save(&request).await
    }

    /// Supplies the missing input an `Approval` step is paused on (§4.2).
    pub async fn approve_discovered_item(&self, item_id: ProcessingItemId, approval_id: String) -> Result<(), PipelineError> {
        self.executor
            .resume_paused(item_id, move |context| {
                context.approval.approval_id = Some(approval_id.clone());
                context.approval.approved = true;
            })
            .await
    }

    /// Lets an operator force a specific release onto a paused `search` step,
    /// independent of the ranking `acceptLowerQuality` would otherwise apply.
    pub async fn override_discovered_release(&self, item_id: ProcessingItemId, release: Release) -> Result<(), PipelineError> {
        self.executor
            .resume_paused(item_id, move |context| {
                context.search.selected_release = Some(release);
            })
            .await
    }
}
