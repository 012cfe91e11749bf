// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scheduler (C10, §5)
//!
//! §5 names a handful of periodic tasks owned by one component — encoder
//! health, progress flush, the three recovery workers, periodic metrics —
//! distinct from the per-item step-execution tasks the executor drives.
//! [`Scheduler`] is that component: a named-task registry that spawns each
//! one on its own `tokio::time::interval`, staggered by a small jitter so a
//! restart doesn't fire every periodic task in the same tick, and tracked so
//! shutdown (§5's sequence: unregister scheduler tasks, flush the progress
//! cache, `server:shutdown` every encoder, close connections) can abort them
//! cleanly instead of leaving them racing the rest of the shutdown sequence.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A small, deterministic spread so same-cadence tasks registered together
/// don't all wake on the same tick. Not a security control — just avoids a
/// thundering herd of recovery sweeps against the same tables.
fn stagger(index: usize) -> Duration {
    Duration::from_millis((index as u64 % 8) * 250)
}

pub struct Scheduler {
    handles: Vec<(String, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { handles: Vec::new() }
    }

    /// Registers a named periodic task: `tick` is called once per `interval`
    /// after an initial stagger delay based on registration order. `tick`
    /// itself is responsible for its own per-sweep error handling (§7: a
    /// recovery worker never propagates — it logs and continues); this only
    /// guards against a tick that panics taking the whole scheduler down.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, interval: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let name = name.into();
        let delay = stagger(self.handles.len());
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // consume the immediate first tick; `delay` already staggered the start
            loop {
                ticker.tick().await;
                tick().await;
            }
        });
        info!(task = %task_name, interval_secs = interval.as_secs(), "scheduler: registered periodic task");
        self.handles.push((name, handle));
    }

    /// §5's shutdown sequence starts with unregistering every scheduler
    /// task before the progress cache flush and `server:shutdown` broadcast.
    pub fn shutdown(&mut self) {
        for (name, handle) in self.handles.drain(..) {
            handle.abort();
            warn!(task = %name, "scheduler: aborted periodic task for shutdown");
        }
    }

    pub fn task_count(&self) -> usize {
        self.handles.len()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        for (_, handle) in self.handles.drain(..) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn registered_task_ticks_on_its_interval() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();
        let counter_clone = counter.clone();
        scheduler.register("test-sweep", Duration::from_secs(60), move || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert!(counter.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn shutdown_clears_the_handle_list() {
        let mut scheduler = Scheduler::new();
        scheduler.register("noop", Duration::from_secs(3600), || async {});
        assert_eq!(scheduler.task_count(), 1);
        scheduler.shutdown();
        assert_eq!(scheduler.task_count(), 0);
    }
}
