// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! §4.5's two periodic detectors, both driven off the same
//! `heartbeatCheckInterval` (~30s) tick from `dispatch::mod`'s scheduler
//! registration:
//!
//! - a connected encoder whose `lastHeartbeat` is older than the heartbeat
//!   timeout (90s) is force-disconnected;
//! - an `encoding` assignment with no progress update in the job stall
//!   timeout (120s), or none at all past twice that, is declared stalled. A
//!   job that never progressed doesn't spend a retry attempt; one that
//!   stalled mid-flight does.

use chrono::Utc;
use tracing::warn;

use media_pipeline_domain::value_objects::assignment_status::AssignmentStatus;

use super::context::DispatchContext;
use super::reconcile;

pub async fn check_heartbeats(ctx: &DispatchContext) {
    let timeout = chrono::Duration::from_std(ctx.heartbeat_timeout).unwrap_or(chrono::Duration::seconds(90));
    let now = Utc::now();

    for encoder_id in ctx.connections.connected_ids() {
        let Ok(encoder) = ctx.encoders.get(encoder_id).await else { continue };
        if now - encoder.last_heartbeat > timeout {
            warn!(%encoder_id, "encoder heartbeat timed out, forcing disconnect");
            reconcile::disconnect(ctx, encoder_id).await;
        }
    }
}

pub async fn check_stalled_jobs(ctx: &DispatchContext) {
    let stall_timeout = chrono::Duration::from_std(ctx.job_stall_timeout).unwrap_or(chrono::Duration::seconds(120));
    let no_progress_timeout = stall_timeout * 2;
    let now = Utc::now();

    let encoding = match ctx.assignments.list_by_status(AssignmentStatus::Encoding).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(%err, "stall detector: failed to list encoding assignments");
            return;
        }
    };

    let snapshot = ctx.progress.snapshot();

    for assignment in encoding {
        let (is_stalled, consumes_attempt) = match snapshot.get(&assignment.id) {
            Some(entry) => match entry.last_progress_at {
                Some(last) => (now - last > stall_timeout, true),
                None => (now - entry.started_at > no_progress_timeout, false),
            },
            None => {
                let started = assignment.started_at.unwrap_or(assignment.created_at);
                (now - started > no_progress_timeout, false)
            }
        };

        if is_stalled {
            reconcile::stalled(ctx, assignment.id, consumes_attempt).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use media_pipeline_domain::entities::{EncoderAssignment, RemoteEncoder};
    use media_pipeline_domain::ports::{EncoderAssignmentRepository, RemoteEncoderRepository};
    use media_pipeline_domain::value_objects::ids::{EncoderAssignmentId, EncoderId, ProcessingItemId};
    use media_pipeline_domain::PipelineError;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::infrastructure::config::EncodeProfile;
    use crate::infrastructure::dispatch::connections::ConnectionRegistry;
    use crate::infrastructure::dispatch::path_translation::PathTranslator;
    use crate::infrastructure::dispatch::progress::ProgressCache;

    #[derive(Default)]
    struct FakeAssignments(Mutex<HashMap<EncoderAssignmentId, EncoderAssignment>>);
    #[async_trait]
    impl EncoderAssignmentRepository for FakeAssignments {
        async fn save(&self, assignment: &EncoderAssignment) -> Result<(), PipelineError> {
            self.0.lock().unwrap().insert(assignment.id, assignment.clone());
            Ok(())
        }
        async fn get(&self, id: EncoderAssignmentId) -> Result<EncoderAssignment, PipelineError> {
            self.0.lock().unwrap().get(&id).cloned().ok_or_else(|| PipelineError::not_found("assignment"))
        }
        async fn get_by_job_id(&self, _job_id: ProcessingItemId) -> Result<Option<EncoderAssignment>, PipelineError> {
            Ok(None)
        }
        async fn find_active_by_input_path(&self, _input_path: &str) -> Result<Option<EncoderAssignment>, PipelineError> {
            Ok(None)
        }
        async fn list_pending_oldest_first(&self) -> Result<Vec<EncoderAssignment>, PipelineError> {
            Ok(vec![])
        }
        async fn list_by_status(&self, status: AssignmentStatus) -> Result<Vec<EncoderAssignment>, PipelineError> {
            Ok(self.0.lock().unwrap().values().filter(|a| a.status == status).cloned().collect())
        }
        async fn list_by_encoder(&self, encoder_id: EncoderId) -> Result<Vec<EncoderAssignment>, PipelineError> {
            Ok(self.0.lock().unwrap().values().filter(|a| a.encoder_id == Some(encoder_id)).cloned().collect())
        }
    }

    #[derive(Default)]
    struct FakeEncoders(Mutex<HashMap<EncoderId, RemoteEncoder>>);
    #[async_trait]
    impl RemoteEncoderRepository for FakeEncoders {
        async fn save(&self, encoder: &RemoteEncoder) -> Result<(), PipelineError> {
            self.0.lock().unwrap().insert(encoder.encoder_id, encoder.clone());
            Ok(())
        }
        async fn get(&self, id: EncoderId) -> Result<RemoteEncoder, PipelineError> {
            self.0.lock().unwrap().get(&id).cloned().ok_or_else(|| PipelineError::not_found("encoder"))
        }
        async fn list_all(&self) -> Result<Vec<RemoteEncoder>, PipelineError> {
            Ok(self.0.lock().unwrap().values().cloned().collect())
        }
    }

    fn ctx(assignments: Arc<FakeAssignments>, encoders: Arc<FakeEncoders>) -> DispatchContext {
        DispatchContext {
            assignments,
            encoders,
            connections: Arc::new(ConnectionRegistry::new()),
            progress: Arc::new(ProgressCache::new()),
            translator: Arc::new(PathTranslator::new(vec![])),
            profiles: Arc::new(HashMap::<String, EncodeProfile>::new()),
            heartbeat_timeout: Duration::from_secs(90),
            job_stall_timeout: Duration::from_secs(120),
        }
    }

    #[tokio::test]
    async fn a_job_that_never_progressed_past_twice_the_stall_window_is_stalled_without_consuming_an_attempt() {
        let assignments = Arc::new(FakeAssignments::default());
        let mut a = EncoderAssignment::new(ProcessingItemId::new(), "/in.mkv", "/out.mkv", "p1", 3);
        a.assign_to(EncoderId::new()).unwrap();
        a.started_at = Some(Utc::now() - chrono::Duration::seconds(300));
        let id = a.id;
        assignments.0.lock().unwrap().insert(a.id, a.clone());
        let encoders = Arc::new(FakeEncoders::default());

        let dispatch_ctx = ctx(assignments.clone(), encoders);
        check_stalled_jobs(&dispatch_ctx).await;

        let after = assignments.0.lock().unwrap().get(&id).cloned().unwrap();
        assert_eq!(after.status, AssignmentStatus::Pending);
        assert_eq!(after.attempt, 1, "a never-progressed stall must not spend a retry attempt");
    }

    #[tokio::test]
    async fn a_fresh_job_within_the_window_is_left_alone() {
        let assignments = Arc::new(FakeAssignments::default());
        let mut a = EncoderAssignment::new(ProcessingItemId::new(), "/in.mkv", "/out.mkv", "p1", 3);
        a.assign_to(EncoderId::new()).unwrap();
        assignments.0.lock().unwrap().insert(a.id, a.clone());
        let encoders = Arc::new(FakeEncoders::default());

        let dispatch_ctx = ctx(assignments.clone(), encoders);
        check_stalled_jobs(&dispatch_ctx).await;

        let after = assignments.0.lock().unwrap().get(&a.id).cloned().unwrap();
        assert_eq!(after.status, AssignmentStatus::Encoding);
    }
}
