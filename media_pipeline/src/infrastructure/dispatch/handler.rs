// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One websocket connection's lifecycle (§4.5, §6): `register` upserts the
//! `RemoteEncoder` row and the live connection table, then every subsequent
//! frame is routed to the matching [`super::reconcile`] transition. A
//! connection's outgoing half is a plain `mpsc` receiver drained by a
//! sibling task, so [`super::connections::ConnectionRegistry::send`] never
//! blocks on the socket itself.

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use media_pipeline_domain::entities::RemoteEncoder;
use media_pipeline_domain::value_objects::ids::{EncoderAssignmentId, EncoderId};

use crate::application::events::{PipelineEvent, ResumeSender};

use super::context::DispatchContext;
use super::protocol::{ServerMessage, WorkerMessage, WorkerState};
use super::reconcile;
use super::sweep::run_sweep;

/// Drives one accepted websocket until it closes, then runs disconnect
/// reconciliation unconditionally (§4.5's "worker disconnect" path) even if
/// the close was never preceded by a clean `register`.
pub async fn run_connection(ctx: DispatchContext, resume_tx: ResumeSender, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ServerMessage>();

    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let Ok(text) = serde_json::to_string(&message) else { continue };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut encoder_id: Option<EncoderId> = None;

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                warn!(%err, "encoder dispatch: websocket read error");
                break;
            }
        };

        let message: WorkerMessage = match serde_json::from_str(&text) {
            Ok(msg) => msg,
            Err(err) => {
                warn!(%err, raw = %text, "encoder dispatch: unparseable worker message");
                continue;
            }
        };

        match message {
            WorkerMessage::Register { encoder_id: id, gpu_device, max_concurrent, current_jobs, hostname, version } => {
                match handle_register(&ctx, id, gpu_device, max_concurrent, current_jobs, hostname, version, out_tx.clone()).await {
                    Some(id) => encoder_id = Some(id),
                    None => break,
                }
            }
            WorkerMessage::Heartbeat { encoder_id: id, current_jobs, state } => {
                handle_heartbeat(&ctx, id, current_jobs, state).await;
            }
            WorkerMessage::JobAccepted { job_id, encoder_id: id } => {
                info!(job_id, encoder_id = id, "encoder accepted job");
            }
            WorkerMessage::JobProgress { job_id, progress, fps, speed, eta, .. } => {
                handle_progress(&ctx, &job_id, progress, fps, speed, eta);
            }
            WorkerMessage::JobComplete { job_id, output_size, compression_ratio, duration } => {
                handle_complete(&ctx, &resume_tx, &job_id, output_size, compression_ratio, duration).await;
            }
            WorkerMessage::JobFailed { job_id, error, retriable } => {
                handle_failed(&ctx, &resume_tx, &job_id, error, retriable).await;
            }
        }
    }

    writer.abort();
    if let Some(id) = encoder_id {
        reconcile::disconnect(&ctx, id).await;
        notify_owned_jobs_failed_if_exhausted(&ctx, &resume_tx, id).await;
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_register(
    ctx: &DispatchContext,
    encoder_id_raw: String,
    gpu_device: String,
    max_concurrent: u32,
    current_jobs: u32,
    hostname: String,
    version: String,
    out_tx: mpsc::UnboundedSender<ServerMessage>,
) -> Option<EncoderId> {
    let encoder_id: EncoderId = match encoder_id_raw.parse() {
        Ok(id) => id,
        Err(err) => {
            warn!(%err, encoder_id = %encoder_id_raw, "encoder dispatch: rejected register with an unparseable encoder id");
            return None;
        }
    };

    let encoder = match ctx.encoders.get(encoder_id).await {
        Ok(mut existing) => {
            existing.gpu_device = gpu_device;
            existing.max_concurrent = max_concurrent;
            existing.hostname = hostname;
            existing.version = version;
            existing.heartbeat(current_jobs);
            existing
        }
        Err(_) => RemoteEncoder::register(encoder_id, gpu_device, max_concurrent, current_jobs, hostname, version),
    };

    if let Err(err) = ctx.encoders.save(&encoder).await {
        warn!(%encoder_id, %err, "encoder dispatch: failed to persist registered encoder");
        return None;
    }

    ctx.connections.insert(encoder_id, out_tx.clone(), max_concurrent, current_jobs);
    let _ = out_tx.send(ServerMessage::Registered);
    info!(%encoder_id, max_concurrent, "encoder registered");

    run_sweep(ctx).await;
    Some(encoder_id)
}

async fn handle_heartbeat(ctx: &DispatchContext, encoder_id_raw: String, current_jobs: u32, state: WorkerState) {
    let Ok(encoder_id) = encoder_id_raw.parse::<EncoderId>() else {
        warn!(encoder_id = %encoder_id_raw, "encoder dispatch: heartbeat from an unparseable encoder id");
        return;
    };
    ctx.connections.update_jobs(encoder_id, current_jobs);
    if let Ok(mut encoder) = ctx.encoders.get(encoder_id).await {
        encoder.heartbeat(current_jobs);
        let _ = ctx.encoders.save(&encoder).await;
    }
    let _ = state;
    ctx.connections.send(encoder_id, ServerMessage::Pong { timestamp: Utc::now().timestamp() });
}

fn handle_progress(ctx: &DispatchContext, job_id: &str, progress: u8, fps: Option<f32>, speed: Option<f32>, eta: Option<u64>) {
    let Ok(assignment_id) = job_id.parse::<EncoderAssignmentId>() else {
        warn!(job_id, "encoder dispatch: progress for an unparseable job id");
        return;
    };
    ctx.progress.record(assignment_id, progress, fps, speed, eta);
}

async fn handle_complete(ctx: &DispatchContext, resume_tx: &ResumeSender, job_id: &str, output_size: u64, compression_ratio: f32, duration: u64) {
    let Ok(assignment_id) = job_id.parse::<EncoderAssignmentId>() else {
        warn!(job_id, "encoder dispatch: job:complete for an unparseable job id");
        return;
    };
    let item_id = match ctx.assignments.get(assignment_id).await {
        Ok(a) => Some(a.job_id),
        Err(err) => {
            warn!(%assignment_id, %err, "encoder dispatch: job:complete for an unknown assignment");
            None
        }
    };
    reconcile::complete(ctx, assignment_id, output_size, compression_ratio, duration).await;
    if let Some(item_id) = item_id {
        let _ = resume_tx.send(PipelineEvent::EncodeCompleted { item_id, assignment_id }).await;
    }
}

async fn handle_failed(ctx: &DispatchContext, resume_tx: &ResumeSender, job_id: &str, error: String, retriable: bool) {
    let Ok(assignment_id) = job_id.parse::<EncoderAssignmentId>() else {
        warn!(job_id, "encoder dispatch: job:failed for an unparseable job id");
        return;
    };
    let item_id = match ctx.assignments.get(assignment_id).await {
        Ok(a) => Some(a.job_id),
        Err(err) => {
            warn!(%assignment_id, %err, "encoder dispatch: job:failed for an unknown assignment");
            None
        }
    };
    reconcile::failed(ctx, assignment_id, error.clone(), retriable).await;

    if let Some(item_id) = item_id {
        if let Ok(assignment) = ctx.assignments.get(assignment_id).await {
            if assignment.status.is_terminal() {
                let _ = resume_tx.send(PipelineEvent::EncodeFailed { item_id, assignment_id, error }).await;
            }
        }
    }
}

/// After a disconnect reassigns or fails every job the encoder owned,
/// whichever landed in `failed` still needs the executor told — `disconnect`
/// itself only touches repositories, since it has no resume sender of its
/// own to call back with.
async fn notify_owned_jobs_failed_if_exhausted(ctx: &DispatchContext, resume_tx: &ResumeSender, encoder_id: EncoderId) {
    let Ok(assignments) = ctx.assignments.list_by_encoder(encoder_id).await else { return };
    for assignment in assignments {
        if assignment.status.is_terminal() && assignment.error.is_some() {
            let _ = resume_tx
                .send(PipelineEvent::EncodeFailed {
                    item_id: assignment.job_id,
                    assignment_id: assignment.id,
                    error: assignment.error.clone().unwrap_or_default(),
                })
                .await;
        }
    }
}
