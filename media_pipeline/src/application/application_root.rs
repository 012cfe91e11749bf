// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Root (§5, §9)
//!
//! The composition point: wires every repository and collaborator port the
//! `main.rs` binary constructs (sqlx adapters, HTTP clients, the encoder
//! dispatch fabric) into a populated [`StepRegistry`], an [`Executor`], the
//! [`Orchestrator`] façade, the three C7 recovery workers, the retry-backoff
//! sweep, and the [`Scheduler`] that drives all of the periodic ones. It also
//! owns the resume-event drain loop (`events`'s module doc) — the single task
//! that turns a [`PipelineEvent`] posted by some collaborator back into an
//! executor call.
//!
//! Nothing here is itself a port implementation; this module only wires
//! already-built `Arc<dyn Trait>` values together, the same shape the
//! teacher's bootstrap layer uses to assemble `FileIOServiceImpl` and friends
//! behind their trait objects before handing them to the pipeline.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use media_pipeline_domain::entities::BreakerConfig;
use media_pipeline_domain::ports::{
    ActivityLogRepository, CircuitBreakerRepository, Clock, DeliveryTransport, DownloadRepository, EncoderAssignmentRepository,
    EncoderDispatchPort, IndexerClient, LibraryItemRepository, NotificationSink, PipelineExecutionRepository,
    PipelineTemplateRepository, ProcessingItemRepository, RequestRepository, TorrentClient,
};
use media_pipeline_domain::value_objects::release::QualityTarget;

use crate::application::circuit_breaker_service::CircuitBreakerService;
use crate::application::events::{resume_channel, PipelineEvent, ResumeSender};
use crate::application::executor::{Executor, RetryBackoffWorker};
use crate::application::naming::NamingConfig;
use crate::application::orchestrator::Orchestrator;
use crate::application::recovery::{DownloadRecoveryWorker, EncoderMonitorWorker, StuckItemRecoveryWorker};
use crate::application::scheduler::Scheduler;
use crate::application::step_registry::StepRegistry;
use crate::application::steps::{ApprovalStep, ConditionalStep, DeliverStep, DownloadStep, EncodeStep, NotificationStep, SearchStep};
use crate::application::transitions::fail_item;

/// Everything `main.rs` otherwise has no natural place to put: the cadence
/// of every scheduled sweep, the quality floor a search applies when a
/// request carries none of its own, and the destination-path roots a
/// delivery resolves against. Populated from the `config` crate layer in
/// `infrastructure::config`, not read directly from the environment here.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_quality_target: QualityTarget,
    pub naming: NamingConfig,
    pub default_max_attempts: u32,
    pub channel_depth: usize,
    pub tv_continuation_delay: Duration,
    pub download_recovery_interval: Duration,
    pub encoder_monitor_interval: Duration,
    pub stuck_item_recovery_interval: Duration,
    pub retry_backoff_interval: Duration,
    pub breaker: BreakerConfig,
}

/// The repository ports `Application::new` wires, grouped only so its
/// constructor doesn't read as an undifferentiated wall of `Arc<dyn _>`
/// parameters. Each field is still just a port the caller already built an
/// adapter for.
pub struct Repositories {
    pub requests: Arc<dyn RequestRepository>,
    pub items: Arc<dyn ProcessingItemRepository>,
    pub templates: Arc<dyn PipelineTemplateRepository>,
    pub executions: Arc<dyn PipelineExecutionRepository>,
    pub assignments: Arc<dyn EncoderAssignmentRepository>,
    pub breakers: Arc<dyn CircuitBreakerRepository>,
    pub downloads: Arc<dyn DownloadRepository>,
    pub activity_log: Arc<dyn ActivityLogRepository>,
    pub library: Arc<dyn LibraryItemRepository>,
}

/// The collaborator ports (§1, §6) out of this system's scope beyond the
/// narrow surface the domain crate's `ports` module declares for them.
pub struct Collaborators {
    pub indexer: Arc<dyn IndexerClient>,
    pub torrents: Arc<dyn TorrentClient>,
    pub transport: Arc<dyn DeliveryTransport>,
    pub notifications: Arc<dyn NotificationSink>,
    pub dispatch: Arc<dyn EncoderDispatchPort>,
    pub clock: Arc<dyn Clock>,
}

/// The composed engine: everything the HTTP/CLI surface and the encoder
/// dispatch fabric need a handle to once the process has started.
pub struct Application {
    pub orchestrator: Arc<Orchestrator>,
    pub executor: Arc<Executor>,
    resume_tx: ResumeSender,
    resume_task: JoinHandle<()>,
    scheduler: Scheduler,
    retry_backoff_task: JoinHandle<()>,
}

impl Application {
    pub fn new(repositories: Repositories, collaborators: Collaborators, config: EngineConfig) -> Self {
        let Repositories { requests, items, templates, executions, assignments, breakers, downloads, activity_log, library } =
            repositories;
        let Collaborators { indexer, torrents, transport, notifications, dispatch, clock } = collaborators;

        let breaker_service = Arc::new(CircuitBreakerService::new(breakers, clock, config.breaker.clone()));
        let (resume_tx, resume_rx) = resume_channel(config.channel_depth);

        let mut registry = StepRegistry::new();
        registry.register(Arc::new(SearchStep::new(
            requests.clone(),
            indexer,
            torrents.clone(),
            breaker_service.clone(),
            config.default_quality_target.clone(),
        )));
        registry.register(Arc::new(DownloadStep::new(requests.clone(), downloads.clone(), items.clone(), torrents, breaker_service.clone())));
        registry.register(Arc::new(EncodeStep::new(assignments.clone())));
        registry.register(Arc::new(DeliverStep::new(
            requests.clone(),
            items.clone(),
            library,
            transport,
            breaker_service.clone(),
            config.naming.clone(),
            resume_tx.clone(),
            config.tv_continuation_delay,
        )));
        registry.register(Arc::new(ApprovalStep));
        registry.register(Arc::new(ConditionalStep));
        registry.register(Arc::new(NotificationStep::new(notifications)));

        let executor =
            Arc::new(Executor::new(items.clone(), executions.clone(), templates.clone(), activity_log.clone(), Arc::new(registry)));

        let orchestrator = Arc::new(Orchestrator::new(
            requests.clone(),
            items.clone(),
            executions.clone(),
            templates.clone(),
            activity_log.clone(),
            executor.clone(),
            dispatch,
            config.default_max_attempts,
        ));

        let download_recovery = Arc::new(DownloadRecoveryWorker::new(items.clone(), requests.clone(), downloads.clone(), activity_log.clone()));
        let encoder_monitor =
            Arc::new(EncoderMonitorWorker::new(items.clone(), requests.clone(), assignments.clone(), templates.clone(), activity_log.clone()));
        let stuck_item_recovery = Arc::new(StuckItemRecoveryWorker::new(items.clone(), downloads, activity_log.clone()));
        let retry_backoff = Arc::new(RetryBackoffWorker::new(items.clone(), executions.clone(), executor.clone()));

        let mut scheduler = Scheduler::new();
        {
            let worker = download_recovery.clone();
            scheduler.register("download-recovery", config.download_recovery_interval, move || {
                let worker = worker.clone();
                async move {
                    worker.sweep_once().await;
                }
            });
        }
        {
            let worker = encoder_monitor.clone();
            scheduler.register("encoder-monitor", config.encoder_monitor_interval, move || {
                let worker = worker.clone();
                async move {
                    worker.sweep_once().await;
                }
            });
        }
        {
            let worker = stuck_item_recovery.clone();
            scheduler.register("stuck-item-recovery", config.stuck_item_recovery_interval, move || {
                let worker = worker.clone();
                async move {
                    worker.sweep_once().await;
                }
            });
        }

        let retry_backoff_task = tokio::spawn(retry_backoff.run_forever(config.retry_backoff_interval));

        let resume_task = spawn_resume_loop(
            executor.clone(),
            orchestrator.clone(),
            requests,
            items,
            assignments,
            templates,
            activity_log,
            resume_rx,
        );

        Self { orchestrator, executor, resume_tx, resume_task, scheduler, retry_backoff_task }
    }

    /// The sender every suspend-aware collaborator (the torrent poller, the
    /// encoder dispatch fabric) clones to post a [`PipelineEvent`] back at
    /// this application's resume loop.
    pub fn resume_sender(&self) -> ResumeSender {
        self.resume_tx.clone()
    }

    /// §5's shutdown sequence: stop taking new scheduler ticks and the retry
    /// sweep, then stop draining resume events. The caller (`main.rs`) still
    /// owns closing the encoder dispatch fabric's connections and flushing
    /// whatever progress cache sits in front of the repositories.
    pub async fn shutdown(mut self) {
        self.scheduler.shutdown();
        self.retry_backoff_task.abort();
        self.resume_task.abort();
    }
}

/// Drains [`PipelineEvent`]s and calls back into the executor or
/// orchestrator. Per §7's error policy this never stops on one event's
/// failure — it logs and keeps draining, since a single missed resume just
/// means the next recovery sweep catches the same item.
#[allow(clippy::too_many_arguments)]
fn spawn_resume_loop(
    executor: Arc<Executor>,
    orchestrator: Arc<Orchestrator>,
    requests: Arc<dyn RequestRepository>,
    items: Arc<dyn ProcessingItemRepository>,
    assignments: Arc<dyn EncoderAssignmentRepository>,
    templates: Arc<dyn PipelineTemplateRepository>,
    activity_log: Arc<dyn ActivityLogRepository>,
    mut resume_rx: crate::application::events::ResumeReceiver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = resume_rx.recv().await {
            let result = match event {
                PipelineEvent::DownloadCompleted { item_id, source_file_path } => {
                    executor
                        .resume_paused(item_id, move |context| {
                            context.download.source_file_path = Some(source_file_path);
                        })
                        .await
                }
                PipelineEvent::EncodeCompleted { item_id, assignment_id } => {
                    match resolve_encoded_file(requests.as_ref(), items.as_ref(), assignments.as_ref(), templates.as_ref(), item_id, assignment_id)
                        .await
                    {
                        Ok(encoded_file) => {
                            executor
                                .resume_paused(item_id, move |context| {
                                    context.encode.encoded_files.push(encoded_file);
                                })
                                .await
                        }
                        Err(err) => {
                            warn!(%item_id, %assignment_id, %err, "resume loop: failed to resolve completed encode's output, resuming without it");
                            executor.resume_paused(item_id, |_context| {}).await
                        }
                    }
                }
                PipelineEvent::EncodeFailed { item_id, error, .. } => {
                    fail_item(items.as_ref(), activity_log.as_ref(), item_id, error).await.map(|_| ())
                }
                PipelineEvent::ApprovalGranted { item_id, approval_id } => {
                    executor
                        .resume_paused(item_id, move |context| {
                            context.approval.approval_id = Some(approval_id);
                            context.approval.approved = true;
                        })
                        .await
                }
                PipelineEvent::Cancelled { execution_id } => {
                    info!(%execution_id, "resume loop observed a cancel reaching a paused execution");
                    Ok(())
                }
                PipelineEvent::TvContinuationDue { request_id } => orchestrator.continue_tv_request(request_id).await,
            };

            if let Err(err) = result {
                warn!(%err, "resume event handling failed");
            }
        }
    })
}

/// Looks up the `ProcessingItem`, its owning `Request` (for `MediaKind`),
/// and the completed `EncoderAssignment` so the resume loop can fold the
/// same `EncodedFile` `EncoderMonitorWorker::apply_completed` would have
/// built into the context before the Deliver step runs — the normal
/// `job:complete` path must not leave `encoded_files` empty just because it
/// didn't go through the recovery sweep.
async fn resolve_encoded_file(
    requests: &dyn RequestRepository,
    items: &dyn ProcessingItemRepository,
    assignments: &dyn EncoderAssignmentRepository,
    templates: &dyn PipelineTemplateRepository,
    item_id: media_pipeline_domain::value_objects::ids::ProcessingItemId,
    assignment_id: media_pipeline_domain::value_objects::ids::EncoderAssignmentId,
) -> Result<media_pipeline_domain::context::EncodedFile, media_pipeline_domain::PipelineError> {
    let item = items.get(item_id).await?;
    let request = requests.get(item.request_id).await?;
    let assignment = assignments.get(assignment_id).await?;
    Ok(crate::application::recovery::build_encoded_file(templates, request.kind, &item, &assignment).await)
}
