// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Executor (C5, §4.2, §4.7)
//!
//! Walks one `PipelineExecution`'s step tree in order, consulting each
//! descriptor's `condition` to decide whether to run or skip it, invoking
//! the registered `Step`, and reacting to its `StepOutput`. `ProcessingItem`
//! is only ever mutated through [`transitions::transition_item_status`] —
//! the single writer §4.7 requires — so this module never imports the
//! repository trait's `save` call path directly against an item without
//! going through it.
//!
//! A step that pauses (`shouldPause`) ends the loop here; resuming it later
//! is [`Executor::resume_paused`], driven by the event bus a download
//! poller, the encoder dispatch fabric, or an approval mutation feeds
//! (`application::events`).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use media_pipeline_domain::entities::pipeline_execution::ExecutionStatus;
use media_pipeline_domain::entities::pipeline_template::StepType;
use media_pipeline_domain::entities::{PipelineExecution, PipelineTemplate};
use media_pipeline_domain::ports::{
    ActivityLogRepository, PipelineExecutionRepository, PipelineTemplateRepository, ProcessingItemRepository,
};
use media_pipeline_domain::step::StepExecutionInput;
use media_pipeline_domain::value_objects::ids::{PipelineExecutionId, ProcessingItemId};
use media_pipeline_domain::value_objects::processing_status::ProcessingStatus;
use media_pipeline_domain::value_objects::step_output::StepOutput;
use media_pipeline_domain::PipelineError;

use crate::application::step_registry::StepRegistry;
use crate::application::transitions::{fail_item, transition_item_status, StatusPatch};

/// `ProcessingStatus` the item must be in before a step type is allowed to
/// run, and the status it advances to once that step type succeeds
/// synchronously (the status for `Download`/`Encode` is only reached later,
/// via `resume_paused`, since both step types always pause on their first
/// invocation — see module docs).
fn entry_status(step_type: StepType) -> Option<ProcessingStatus> {
    match step_type {
        StepType::Search => Some(ProcessingStatus::Searching),
        StepType::Download => Some(ProcessingStatus::Downloading),
        StepType::Encode => Some(ProcessingStatus::Encoding),
        StepType::Deliver => Some(ProcessingStatus::Delivering),
        StepType::Approval | StepType::Notification | StepType::Conditional => None,
    }
}

fn synchronous_exit_status(step_type: StepType, shortcut_to_encode: bool) -> Option<ProcessingStatus> {
    match step_type {
        StepType::Search if shortcut_to_encode => Some(ProcessingStatus::Downloaded),
        StepType::Search => Some(ProcessingStatus::Found),
        StepType::Deliver => Some(ProcessingStatus::Completed),
        StepType::Download | StepType::Encode | StepType::Approval | StepType::Notification | StepType::Conditional => None,
    }
}

/// Backoff for a `shouldRetry` step outcome: a short fixed wait growing with
/// attempt count, capped well under the item's `maxAttempts` budget check.
fn retry_backoff(attempts: u32) -> chrono::DateTime<Utc> {
    let seconds = 15u64.saturating_mul(1 << attempts.min(6));
    Utc::now() + chrono::Duration::seconds(seconds as i64)
}

pub struct Executor {
    items: Arc<dyn ProcessingItemRepository>,
    executions: Arc<dyn PipelineExecutionRepository>,
    templates: Arc<dyn PipelineTemplateRepository>,
    activity_log: Arc<dyn ActivityLogRepository>,
    registry: Arc<StepRegistry>,
}

impl Executor {
    pub fn new(
        items: Arc<dyn ProcessingItemRepository>,
        executions: Arc<dyn PipelineExecutionRepository>,
        templates: Arc<dyn PipelineTemplateRepository>,
        activity_log: Arc<dyn ActivityLogRepository>,
        registry: Arc<StepRegistry>,
    ) -> Self {
        Self { items, executions, templates, activity_log, registry }
    }

    /// Entry point for a freshly created (or freshly resumed-without-event)
    /// execution: runs the step loop until it pauses, fails, or completes.
    pub async fn run(&self, execution_id: PipelineExecutionId) -> Result<(), PipelineError> {
        let mut execution = self.executions.get(execution_id).await?;
        if execution.status.is_terminal() {
            return Ok(());
        }
        self.drive(&mut execution).await
    }

    /// Wakes a paused execution back up after its correlation event arrived,
    /// folding in whatever the collaborator learned (a resolved source file
    /// path, an encode's output, an approval) before continuing the loop.
    pub async fn resume_paused(
        &self,
        item_id: ProcessingItemId,
        on_resume: impl FnOnce(&mut media_pipeline_domain::context::ProcessingContext),
    ) -> Result<(), PipelineError> {
        let Some(mut execution) = self.executions.find_active_by_item(item_id).await? else {
            warn!(%item_id, "resume event for item with no active execution");
            return Ok(());
        };
        if execution.status != ExecutionStatus::Paused {
            return Ok(());
        }

        on_resume(&mut execution.context);
        execution.resume()?;

        let template = self.templates.get(execution.template_id).await?;
        if let Some(descriptor) = template.steps.get(execution.current_step_index) {
            if let Some(exit) = paused_exit_status(descriptor.step_type) {
                transition_item_status(
                    self.items.as_ref(),
                    self.activity_log.as_ref(),
                    item_id,
                    exit,
                    StatusPatch::default().with_context(execution.context.clone()),
                )
                .await?;
            }
        }
        execution.advance_step();
        self.executions.save(&execution).await?;

        self.drive(&mut execution).await
    }

    async fn drive(&self, execution: &mut PipelineExecution) -> Result<(), PipelineError> {
        let template = self.templates.get(execution.template_id).await?;

        loop {
            let Some(descriptor) = template.steps.get(execution.current_step_index).cloned() else {
                execution.finish(ExecutionStatus::Completed);
                self.executions.save(execution).await?;
                return Ok(());
            };

            if let Some(condition) = &descriptor.condition {
                if !media_pipeline_domain::condition::evaluate(&execution.context.as_json(), condition) {
                    execution.advance_step();
                    continue;
                }
            }

            if let Some(status) = entry_status(descriptor.step_type) {
                let item = self.items.get(execution.item_id).await?;
                if item.status != status {
                    transition_item_status(
                        self.items.as_ref(),
                        self.activity_log.as_ref(),
                        execution.item_id,
                        status,
                        StatusPatch::default().with_current_step(Some(descriptor.name.clone())),
                    )
                    .await?;
                }
            }

            let step = self.registry.get(descriptor.step_type)?;
            let input = StepExecutionInput {
                request_id: execution.request_id,
                item_id: execution.item_id,
                execution_id: execution.id,
                context: execution.context.clone(),
            };

            let output = step.execute(&input, &descriptor.config).await?;
            if let Some(context) = context_from(&output) {
                execution.context = context;
            }

            match self.handle_output(execution, &template, &descriptor, output).await? {
                Flow::Continue => continue,
                Flow::Stop => return Ok(()),
            }
        }
    }

    async fn handle_output(
        &self,
        execution: &mut PipelineExecution,
        template: &PipelineTemplate,
        descriptor: &media_pipeline_domain::entities::StepDescriptor,
        output: StepOutput,
    ) -> Result<Flow, PipelineError> {
        if !output.success {
            let item = self.items.get(execution.item_id).await?;
            if output.should_retry && item.attempts + 1 < item.max_attempts {
                let attempts = item.attempts + 1;
                transition_item_status(
                    self.items.as_ref(),
                    self.activity_log.as_ref(),
                    execution.item_id,
                    item.status,
                    StatusPatch::default()
                        .with_attempts(attempts)
                        .with_last_error(output.error.clone())
                        .with_next_retry_at(Some(retry_backoff(attempts))),
                )
                .await?;
                info!(item_id = %execution.item_id, attempts, "step reported a retryable failure, backing off");
                return Ok(Flow::Stop);
            }

            let error = output.error.unwrap_or_else(|| "step failed".to_string());
            fail_item(self.items.as_ref(), self.activity_log.as_ref(), execution.item_id, error).await?;
            execution.finish(ExecutionStatus::Failed);
            self.executions.save(execution).await?;
            return Ok(Flow::Stop);
        }

        if output.should_pause {
            let correlation_id = output
                .data
                .as_ref()
                .and_then(|d| d.get("correlation_id"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}-{}", execution.item_id, execution.current_step_index));
            execution.suspend(correlation_id);
            self.executions.save(execution).await?;
            return Ok(Flow::Stop);
        }

        let shortcut = matches!(output.next_step, Some(Some(ref name)) if name == "encode") && descriptor.step_type == StepType::Search;
        if let Some(exit) = synchronous_exit_status(descriptor.step_type, shortcut) {
            transition_item_status(
                self.items.as_ref(),
                self.activity_log.as_ref(),
                execution.item_id,
                exit,
                StatusPatch::default().with_context(execution.context.clone()),
            )
            .await?;
        }

        match output.next_step {
            Some(None) => {
                execution.suspend(format!("manual-{}", execution.item_id));
                self.executions.save(execution).await?;
                Ok(Flow::Stop)
            }
            Some(Some(name)) => {
                match template.step_by_name(&name) {
                    Some(target) => {
                        let idx = template.steps.iter().position(|s| s.name == target.name).unwrap_or(execution.current_step_index + 1);
                        execution.current_step_index = idx;
                        execution.updated_at = Utc::now();
                    }
                    None => execution.advance_step(),
                }
                self.executions.save(execution).await?;
                Ok(Flow::Continue)
            }
            None => {
                execution.advance_step();
                self.executions.save(execution).await?;
                Ok(Flow::Continue)
            }
        }
    }
}

fn context_from(output: &StepOutput) -> Option<media_pipeline_domain::context::ProcessingContext> {
    let data = output.data.as_ref()?;
    serde_json::from_value(data.clone()).ok()
}

/// Mirrors `synchronous_exit_status` for the two step types that only ever
/// pause on their first invocation and complete via `resume_paused`.
fn paused_exit_status(step_type: StepType) -> Option<ProcessingStatus> {
    match step_type {
        StepType::Download => Some(ProcessingStatus::Downloaded),
        StepType::Encode => Some(ProcessingStatus::Encoded),
        _ => None,
    }
}

enum Flow {
    Continue,
    Stop,
}

/// A tight retry-backoff sweep over items whose `next_retry_at` has elapsed,
/// re-entering the executor's loop for their active execution. Not part of
/// spec.md's named components directly — it is the ambient complement
/// `TorrentClient`/step `shouldRetry` semantics need, since nothing else
/// re-drives a retryable item once its backoff window passes.
pub struct RetryBackoffWorker {
    items: Arc<dyn ProcessingItemRepository>,
    executions: Arc<dyn PipelineExecutionRepository>,
    executor: Arc<Executor>,
}

impl RetryBackoffWorker {
    pub fn new(items: Arc<dyn ProcessingItemRepository>, executions: Arc<dyn PipelineExecutionRepository>, executor: Arc<Executor>) -> Self {
        Self { items, executions, executor }
    }

    pub async fn sweep_once(&self) -> Result<usize, PipelineError> {
        let now = Utc::now();
        let mut retried = 0;
        for status in [ProcessingStatus::Searching, ProcessingStatus::Downloading, ProcessingStatus::Encoding, ProcessingStatus::Delivering] {
            for item in self.items.list_by_status(status).await? {
                if item.next_retry_at.map(|at| at <= now).unwrap_or(false) {
                    if let Some(execution) = self.executions.find_active_by_item(item.id).await? {
                        if let Err(err) = self.executor.run(execution.id).await {
                            warn!(item_id = %item.id, %err, "retry sweep failed to re-drive execution");
                        } else {
                            retried += 1;
                        }
                    }
                }
            }
        }
        Ok(retried)
    }

    pub async fn run_forever(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = self.sweep_once().await {
                warn!(%err, "retry backoff sweep failed");
            }
        }
    }
}
