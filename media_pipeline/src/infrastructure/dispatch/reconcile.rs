// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The assignment-state transitions triggered by a worker message
//! (`job:complete`/`job:failed`) or by the stall/disconnect detectors in
//! [`super::stall`]. Kept apart from [`super::handler`] since the same
//! failure-and-retry logic fires from both a message handler and a timer.

use tracing::{info, warn};

use media_pipeline_domain::value_objects::ids::{EncoderAssignmentId, EncoderId};
use media_pipeline_domain::PipelineError;

use super::context::DispatchContext;
use super::protocol::ServerMessage;
use super::sweep::run_sweep;

pub async fn complete(ctx: &DispatchContext, assignment_id: EncoderAssignmentId, output_size: u64, compression_ratio: f32, duration: u64) {
    let mut assignment = match ctx.assignments.get(assignment_id).await {
        Ok(a) => a,
        Err(err) => {
            warn!(%assignment_id, %err, "job:complete for an unknown assignment");
            return;
        }
    };
    if let Err(err) = assignment.complete(output_size, compression_ratio, duration) {
        warn!(%assignment_id, %err, "job:complete arrived for an assignment that can't accept it");
        return;
    }
    if let Err(err) = ctx.assignments.save(&assignment).await {
        warn!(%assignment_id, %err, "failed to persist completed assignment");
        return;
    }
    if let Some(encoder_id) = assignment.encoder_id {
        ctx.connections.note_completed(encoder_id);
        persist_encoder_completion(ctx, encoder_id).await;
    }
    ctx.progress.remove(assignment_id);
    info!(%assignment_id, "encode job completed");
    run_sweep(ctx).await;
}

pub async fn failed(ctx: &DispatchContext, assignment_id: EncoderAssignmentId, error: String, retriable: bool) {
    let mut assignment = match ctx.assignments.get(assignment_id).await {
        Ok(a) => a,
        Err(err) => {
            warn!(%assignment_id, %err, "job:failed for an unknown assignment");
            return;
        }
    };
    if let Some(encoder_id) = assignment.encoder_id {
        ctx.connections.note_released(encoder_id);
        persist_encoder_release(ctx, encoder_id).await;
    }

    // §4.5: a reported "input file not found" is re-checked on the server
    // before honouring `retriable` — a transient mid-transfer miss is
    // retriable, but a truly absent file never is.
    let retriable = if retriable && error.to_lowercase().contains("not found") {
        tokio::fs::try_exists(&assignment.input_path).await.unwrap_or(false)
    } else {
        retriable
    };

    if retriable && assignment.can_retry() {
        ctx.progress.remove(assignment_id);
        if let Err(err) = assignment.reset_for_retry(None) {
            warn!(%assignment_id, %err, "failed to reset assignment for retry");
            return;
        }
        if let Err(err) = ctx.assignments.save(&assignment).await {
            warn!(%assignment_id, %err, "failed to persist retry reset");
            return;
        }
        info!(%assignment_id, %error, "encode job failed, retrying");
        run_sweep(ctx).await;
        return;
    }

    let owning_encoder = assignment.encoder_id;
    if let Err(err) = assignment.fail(error.clone()) {
        warn!(%assignment_id, %err, "failed to mark assignment failed");
        return;
    }
    if let Err(err) = ctx.assignments.save(&assignment).await {
        warn!(%assignment_id, %err, "failed to persist failed assignment");
    }
    if let Some(encoder_id) = owning_encoder {
        persist_encoder_failure(ctx, encoder_id).await;
    }
    warn!(%assignment_id, %error, "encode job failed permanently");
}

/// A worker disconnecting (explicit close, or forced by heartbeat timeout):
/// its row goes offline and every job it owned either gets requeued against
/// a different encoder or, out of retry budget, is marked failed.
pub async fn disconnect(ctx: &DispatchContext, encoder_id: EncoderId) {
    ctx.connections.remove(encoder_id);

    if let Ok(mut encoder) = ctx.encoders.get(encoder_id).await {
        encoder.mark_offline();
        if let Err(err) = ctx.encoders.save(&encoder).await {
            warn!(%encoder_id, %err, "failed to persist encoder offline state");
        }
    }

    let owned = match ctx.assignments.list_by_encoder(encoder_id).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(%encoder_id, %err, "failed to list assignments owned by disconnecting encoder");
            return;
        }
    };

    for mut assignment in owned {
        if !assignment.status.is_active() {
            continue;
        }
        ctx.progress.remove(assignment.id);
        if assignment.can_retry() {
            if let Err(err) = assignment.reset_for_retry(None) {
                warn!(assignment_id = %assignment.id, %err, "failed to requeue assignment after disconnect");
                continue;
            }
        } else if let Err(err) = assignment.fail("encoder disconnected with no retry attempts left") {
            warn!(assignment_id = %assignment.id, %err, "failed to fail assignment after disconnect");
            continue;
        }
        if let Err(err) = ctx.assignments.save(&assignment).await {
            warn!(assignment_id = %assignment.id, %err, "failed to persist assignment after disconnect");
        }
    }

    run_sweep(ctx).await;
}

/// A job declared stalled by [`super::stall`]: cancel the remote copy (best
/// effort — the worker may already be gone), requeue or fail depending on
/// retry budget, and sweep. Per §4.5, a job that never sent any progress
/// does not spend a retry attempt — `consumes_attempt` is false for that
/// case, decided by the caller from the progress-cache snapshot.
pub async fn stalled(ctx: &DispatchContext, assignment_id: EncoderAssignmentId, consumes_attempt: bool) {
    let mut assignment = match ctx.assignments.get(assignment_id).await {
        Ok(a) => a,
        Err(err) => {
            warn!(%assignment_id, %err, "stall detected for an unknown assignment");
            return;
        }
    };

    if let Some(encoder_id) = assignment.encoder_id {
        ctx.connections.send(encoder_id, ServerMessage::JobCancel { job_id: assignment_id.to_string(), reason: "stalled".into() });
        ctx.connections.note_released(encoder_id);
        persist_encoder_release(ctx, encoder_id).await;
    }
    ctx.progress.remove(assignment_id);

    if !consumes_attempt {
        // Free reset: goes back to pending without touching the attempt
        // counter or retry budget.
        use media_pipeline_domain::value_objects::assignment_status::{self, AssignmentStatus};
        if let Err(err) = assignment_status::transition(assignment.status, AssignmentStatus::Pending) {
            warn!(%assignment_id, %err, "failed to requeue never-progressed stalled assignment");
            return;
        }
        assignment.status = AssignmentStatus::Pending;
        assignment.encoder_id = None;
        assignment.assigned_at = None;
        assignment.started_at = None;
    } else if assignment.can_retry() {
        if let Err(err) = assignment.reset_for_retry(None) {
            warn!(%assignment_id, %err, "failed to requeue stalled assignment");
            return;
        }
    } else if let Err(err) = assignment.fail("job stalled with no retry attempts left") {
        warn!(%assignment_id, %err, "failed to fail stalled assignment");
        return;
    }
    if let Err(err) = ctx.assignments.save(&assignment).await {
        warn!(%assignment_id, %err, "failed to persist stalled assignment");
        return;
    }
    warn!(%assignment_id, "job:progress stall detected");
    run_sweep(ctx).await;
}

pub async fn cancel(ctx: &DispatchContext, assignment_id: EncoderAssignmentId) -> Result<(), PipelineError> {
    let mut assignment = ctx.assignments.get(assignment_id).await?;
    if let Some(encoder_id) = assignment.encoder_id {
        ctx.connections.send(encoder_id, ServerMessage::JobCancel { job_id: assignment_id.to_string(), reason: "cancelled".into() });
        if assignment.status.is_active() {
            ctx.connections.note_released(encoder_id);
            persist_encoder_release(ctx, encoder_id).await;
        }
    }
    ctx.progress.remove(assignment_id);
    assignment.cancel()?;
    ctx.assignments.save(&assignment).await
}

async fn persist_encoder_completion(ctx: &DispatchContext, encoder_id: EncoderId) {
    if let Ok(mut encoder) = ctx.encoders.get(encoder_id).await {
        encoder.release_job();
        encoder.total_completed += 1;
        let _ = ctx.encoders.save(&encoder).await;
    }
}

async fn persist_encoder_release(ctx: &DispatchContext, encoder_id: EncoderId) {
    if let Ok(mut encoder) = ctx.encoders.get(encoder_id).await {
        encoder.release_job();
        let _ = ctx.encoders.save(&encoder).await;
    }
}

async fn persist_encoder_failure(ctx: &DispatchContext, encoder_id: EncoderId) {
    if let Ok(mut encoder) = ctx.encoders.get(encoder_id).await {
        encoder.total_failed += 1;
        let _ = ctx.encoders.save(&encoder).await;
    }
}
