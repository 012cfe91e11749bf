// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! §4.5's throttled progress cache: every `job:progress` updates this
//! in-memory table unconditionally, but a row is only written back to the
//! `EncoderAssignment` repository at most once every five seconds. A
//! two-second flush loop (`flush_dirty`, spawned from `dispatch::mod`)
//! persists whatever has gone stale. The stall detector reads `last_progress_at`
//! from here rather than the DB, since it needs the freshest value.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::warn;

use media_pipeline_domain::ports::EncoderAssignmentRepository;
use media_pipeline_domain::value_objects::ids::EncoderAssignmentId;

const PERSIST_INTERVAL: chrono::Duration = chrono::Duration::seconds(5);

#[derive(Debug, Clone)]
pub struct ProgressEntry {
    pub progress: u8,
    pub fps: Option<f32>,
    pub speed: Option<f32>,
    pub eta: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub last_progress_at: Option<DateTime<Utc>>,
    last_persisted_at: Option<DateTime<Utc>>,
    dirty: bool,
}

#[derive(Default)]
pub struct ProgressCache {
    entries: Mutex<HashMap<EncoderAssignmentId, ProgressEntry>>,
}

impl ProgressCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_started(&self, assignment_id: EncoderAssignmentId, started_at: DateTime<Utc>) {
        self.entries.lock().unwrap().insert(
            assignment_id,
            ProgressEntry { progress: 0, fps: None, speed: None, eta: None, started_at, last_progress_at: None, last_persisted_at: None, dirty: false },
        );
    }

    pub fn record(&self, assignment_id: EncoderAssignmentId, progress: u8, fps: Option<f32>, speed: Option<f32>, eta: Option<u64>) {
        let mut entries = self.entries.lock().unwrap();
        let now = Utc::now();
        let entry = entries.entry(assignment_id).or_insert_with(|| ProgressEntry {
            progress: 0,
            fps: None,
            speed: None,
            eta: None,
            started_at: now,
            last_progress_at: None,
            last_persisted_at: None,
            dirty: false,
        });
        entry.progress = progress;
        entry.fps = fps;
        entry.speed = speed;
        entry.eta = eta;
        entry.last_progress_at = Some(now);
        entry.dirty = true;
    }

    pub fn remove(&self, assignment_id: EncoderAssignmentId) {
        self.entries.lock().unwrap().remove(&assignment_id);
    }

    /// A snapshot used by the stall detector; cheap clone since entries are
    /// small and the sweep interval is tens of seconds.
    pub fn snapshot(&self) -> HashMap<EncoderAssignmentId, ProgressEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Persists every entry that's dirty and whose last write is older than
    /// the five-second throttle window. Called both by the periodic flush
    /// task and synchronously at shutdown.
    pub async fn flush_dirty(&self, assignments: &dyn EncoderAssignmentRepository) {
        let due: Vec<(EncoderAssignmentId, ProgressEntry)> = {
            let mut entries = self.entries.lock().unwrap();
            let now = Utc::now();
            entries
                .iter_mut()
                .filter(|(_, e)| e.dirty && e.last_persisted_at.map(|t| now - t >= PERSIST_INTERVAL).unwrap_or(true))
                .map(|(id, e)| {
                    e.dirty = false;
                    e.last_persisted_at = Some(now);
                    (*id, e.clone())
                })
                .collect()
        };

        for (id, entry) in due {
            let mut assignment = match assignments.get(id).await {
                Ok(a) => a,
                Err(err) => {
                    warn!(assignment_id = %id, %err, "progress flush: assignment vanished");
                    continue;
                }
            };
            assignment.apply_progress(entry.progress, entry.fps, entry.speed, entry.eta);
            if let Err(err) = assignments.save(&assignment).await {
                warn!(assignment_id = %id, %err, "progress flush: failed to persist");
            }
        }
    }
}

impl Default for ProgressEntry {
    fn default() -> Self {
        Self { progress: 0, fps: None, speed: None, eta: None, started_at: Utc::now(), last_progress_at: None, last_persisted_at: None, dirty: false }
    }
}
