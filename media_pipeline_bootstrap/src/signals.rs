// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Listens for `SIGTERM`/`SIGINT` (Unix) or Ctrl-C (Windows) and drives a
//! [`ShutdownCoordinator`](crate::shutdown::ShutdownCoordinator) so every
//! task holding its `CancellationToken` — the executor's hot loop, the
//! encoder dispatch server, the scheduler's periodic tasks (§5) — unwinds
//! the same way whether shutdown was operator-initiated or signal-initiated.

use crate::shutdown::ShutdownCoordinator;

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut int = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    tokio::select! {
        _ = term.recv() => tracing::info!("received SIGTERM"),
        _ = int.recv() => tracing::info!("received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    tracing::info!("received Ctrl-C");
}

/// Spawns a task that waits for a termination signal and then initiates
/// shutdown on `coordinator`. Fire-and-forget: the caller holds the
/// coordinator itself and awaits `wait_for_shutdown`/`wait_with_timeout`.
pub fn install(coordinator: ShutdownCoordinator) {
    tokio::spawn(async move {
        wait_for_signal().await;
        coordinator.initiate_shutdown();
    });
}
