// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Encoder Dispatch Fabric (C9, §4.5)
//!
//! The websocket-fronted pool manager the spec calls the concurrency core.
//! Submodules, inner-to-outer:
//!
//! - [`protocol`] — the wire messages (§6)
//! - [`connections`] — the live worker connection table (§5)
//! - [`progress`] — the throttled progress cache
//! - [`path_translation`] — the server↔remote path prefix map
//! - [`context`] — [`DispatchContext`], the handle every task below shares
//! - [`sweep`] — the assignment sweep (enqueue → `job:assign`)
//! - [`reconcile`] — the assignment-state transitions a worker message or a
//!   timer drives
//! - [`handler`] — one websocket connection's read loop
//! - [`stall`] — the two periodic detectors (heartbeat timeout, job stall)
//!
//! This module is the composition root: [`DispatchServer`] builds the axum
//! router, spawns the periodic tasks, and is the `EncoderDispatchPort`
//! implementation `application_root` wires into the orchestrator.

pub mod connections;
pub mod context;
pub mod handler;
pub mod path_translation;
pub mod progress;
pub mod protocol;
pub mod reconcile;
pub mod stall;
pub mod sweep;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use media_pipeline_domain::ports::{EncoderAssignmentRepository, EncoderDispatchPort, RemoteEncoderRepository};
use media_pipeline_domain::value_objects::ids::EncoderAssignmentId;
use media_pipeline_domain::PipelineError;

use crate::application::events::ResumeSender;
use crate::infrastructure::config::DispatchConfig;

use self::connections::ConnectionRegistry;
use self::context::DispatchContext;
use self::path_translation::PathTranslator;
use self::progress::ProgressCache;
use self::protocol::ServerMessage;

#[derive(Clone)]
struct AppState {
    ctx: DispatchContext,
    resume_tx: ResumeSender,
}

/// The axum server plus the periodic background tasks it owns (the
/// assignment sweep's own cadence, the heartbeat/stall detectors, and the
/// progress cache's 2s flush loop, §4.5/§5). Also `media-pipeline`'s
/// `EncoderDispatchPort` implementation — `cancel_job` is the orchestrator's
/// only direct call into this fabric (§4.7's `cancel(itemId)`).
pub struct DispatchServer {
    ctx: DispatchContext,
    tasks: Vec<JoinHandle<()>>,
}

impl DispatchServer {
    /// Builds the shared [`DispatchContext`] from configuration, but does
    /// not yet bind a socket or spawn background work — call [`Self::serve`]
    /// for that once the caller is ready to accept connections.
    pub fn new(
        config: &DispatchConfig,
        assignments: Arc<dyn EncoderAssignmentRepository>,
        encoders: Arc<dyn RemoteEncoderRepository>,
    ) -> Self {
        let ctx = DispatchContext {
            assignments,
            encoders,
            connections: Arc::new(ConnectionRegistry::new()),
            progress: Arc::new(ProgressCache::new()),
            translator: Arc::new(PathTranslator::new(config.path_translation_table())),
            profiles: Arc::new(config.profile_catalog()),
            heartbeat_timeout: config.heartbeat_timeout(),
            job_stall_timeout: config.job_stall_timeout(),
        };

        Self { ctx, tasks: Vec::new() }
    }

    pub fn context(&self) -> DispatchContext {
        self.ctx.clone()
    }

    fn router(&self, resume_tx: ResumeSender) -> Router {
        Router::new().route("/ws", get(ws_upgrade)).with_state(AppState { ctx: self.ctx.clone(), resume_tx })
    }

    /// Binds `bind_address` and spawns the periodic detectors; the returned
    /// join handle resolves once the listener shuts down (on
    /// [`Self::shutdown`] or an unrecoverable bind error). Per §5, the
    /// assignment sweep itself also runs on its own cadence here in
    /// addition to being triggered after every enqueue/completion/failure.
    pub async fn serve(&mut self, bind_address: &str, resume_tx: ResumeSender, heartbeat_check_interval: Duration) -> Result<JoinHandle<()>, PipelineError> {
        let addr: SocketAddr = bind_address.parse().map_err(|e| PipelineError::ConfigError(format!("invalid dispatch bind address '{bind_address}': {e}")))?;
        let listener = TcpListener::bind(addr).await.map_err(|e| PipelineError::internal(format!("failed to bind encoder dispatch socket: {e}")))?;
        info!(%addr, "encoder dispatch fabric listening");

        self.tasks.push(spawn_periodic(self.ctx.clone(), heartbeat_check_interval, |ctx| async move {
            stall::check_heartbeats(&ctx).await;
            stall::check_stalled_jobs(&ctx).await;
        }));
        self.tasks.push(spawn_periodic(self.ctx.clone(), Duration::from_secs(2), |ctx| async move {
            ctx.progress.flush_dirty(ctx.assignments.as_ref()).await;
        }));
        self.tasks.push(spawn_periodic(self.ctx.clone(), heartbeat_check_interval, |ctx| async move {
            sweep::run_sweep(&ctx).await;
        }));

        let router = self.router(resume_tx);
        Ok(tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, router.into_make_service()).await {
                warn!(%err, "encoder dispatch fabric exited");
            }
        }))
    }

    /// §5's shutdown sequence: broadcast `server:shutdown` so every
    /// connected encoder knows to reconnect after `reconnect_delay`, flush
    /// the progress cache synchronously, then stop the periodic tasks.
    /// In-flight `encoding` assignments are deliberately left as-is — stall
    /// detection on the next process requeues them once the timeout passes.
    pub async fn shutdown(mut self, reconnect_delay: Duration) {
        let reconnect_delay_ms = reconnect_delay.as_millis() as u64;
        self.ctx.connections.broadcast(|| ServerMessage::ServerShutdown { reconnect_delay: reconnect_delay_ms });
        self.ctx.progress.flush_dirty(self.ctx.assignments.as_ref()).await;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

/// `DispatchContext` is cheap to clone (every field is an `Arc`), so the
/// orchestrator's `EncoderDispatchPort` handle is a standalone
/// `Arc::new(dispatch_server.context())` rather than the `DispatchServer`
/// itself — `DispatchServer::serve`/`shutdown` own the listener and
/// background tasks, a lifecycle the orchestrator has no business touching.
#[async_trait]
impl EncoderDispatchPort for DispatchContext {
    async fn cancel_job(&self, assignment_id: EncoderAssignmentId) -> Result<(), PipelineError> {
        reconcile::cancel(self, assignment_id).await
    }
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handler::run_connection(state.ctx, state.resume_tx, socket))
}

fn spawn_periodic<F, Fut>(ctx: DispatchContext, interval: Duration, f: F) -> JoinHandle<()>
where
    F: Fn(DispatchContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it so we don't race `serve`'s caller setup
        loop {
            ticker.tick().await;
            f(ctx.clone()).await;
        }
    })
}
