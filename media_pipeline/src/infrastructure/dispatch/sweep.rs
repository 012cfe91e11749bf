// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The assignment sweep (§4.5): drains `list_pending_oldest_first`, picks a
//! connected encoder with spare capacity, and pushes `job:assign`. Invoked
//! after every enqueue, completion, failure, and stall, plus on its own
//! `Scheduler` cadence so a pending row left behind by a transient "no
//! encoder had capacity" outcome still gets picked up.

use chrono::Utc;
use tracing::{info, warn};

use media_pipeline_domain::entities::EncoderAssignment;
use media_pipeline_domain::value_objects::ids::EncoderId;
use media_pipeline_domain::PipelineError;

use crate::infrastructure::logging::dispatch_span;

use super::context::DispatchContext;
use super::protocol::ServerMessage;

/// Runs one pass over every pending assignment, oldest first. Never aborts
/// early on a single assignment's failure — the remaining rows still get a
/// chance this pass.
pub async fn run_sweep(ctx: &DispatchContext) {
    let pending = match ctx.assignments.list_pending_oldest_first().await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(%err, "assignment sweep: failed to list pending assignments");
            return;
        }
    };

    for assignment in pending {
        if let Err(err) = try_assign(ctx, assignment).await {
            warn!(%err, "assignment sweep: failed to process a pending assignment");
        }
    }
}

async fn try_assign(ctx: &DispatchContext, mut assignment: EncoderAssignment) -> Result<(), PipelineError> {
    let Some(candidate) = pick_candidate(ctx, assignment.encoder_id) else {
        return Ok(());
    };

    if !tokio::fs::try_exists(&assignment.input_path).await.unwrap_or(false) {
        // The download may still be settling; leave it pending for the next sweep.
        return Ok(());
    }

    let Some(profile) = ctx.profiles.get(&assignment.profile_id).cloned() else {
        warn!(profile_id = %assignment.profile_id, "assignment sweep: no such encode profile configured");
        return Ok(());
    };

    let remote_input = ctx.translator.to_remote(&assignment.input_path)?;
    let remote_output = ctx.translator.to_remote(&assignment.output_path)?;

    assignment.assign_to(candidate)?;
    ctx.assignments.save(&assignment).await?;

    if let Ok(mut encoder) = ctx.encoders.get(candidate).await {
        encoder.take_job();
        if let Err(err) = ctx.encoders.save(&encoder).await {
            warn!(encoder_id = %candidate, %err, "assignment sweep: failed to persist encoder job count");
        }
    }
    ctx.connections.note_taken(candidate);
    ctx.progress.mark_started(assignment.id, Utc::now());

    let span = dispatch_span(&candidate.to_string(), &assignment.id.to_string());
    let _enter = span.enter();

    let sent = ctx.connections.send(
        candidate,
        ServerMessage::JobAssign {
            job_id: assignment.id.to_string(),
            input_path: remote_input,
            output_path: remote_output,
            profile_id: assignment.profile_id.clone(),
            profile,
        },
    );
    if sent {
        info!("assigned job to encoder");
    } else {
        warn!("encoder disconnected before job:assign could be delivered");
    }
    Ok(())
}

/// §4.5 step 2's selection rule: prefer the connected encoder with the most
/// spare capacity, tie-broken by `totalCompleted`; if none has capacity but
/// at least one is connected, fall back to an arbitrary connected one. An
/// assignment already carrying an `encoder_id` (a retry/reassignment target
/// chosen by the caller) is honoured if that encoder is still connected.
fn pick_candidate(ctx: &DispatchContext, preferred: Option<EncoderId>) -> Option<EncoderId> {
    if let Some(preferred) = preferred {
        if ctx.connections.is_connected(preferred) {
            return Some(preferred);
        }
    }
    let mut candidates = ctx.connections.candidates_with_capacity();
    if let Some(best) = candidates.drain(..).next() {
        return Some(best.encoder_id);
    }
    ctx.connections.any_connected()
}
