// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # ProcessingItem — the atomic unit of work
//!
//! One movie, or one TV episode (§3). Mutated only through the orchestrator's
//! `transitionStatus` (C6, §4.7), which is the single writer of `status`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ProcessingContext;
use crate::value_objects::ids::{DownloadId, EncoderAssignmentId, ProcessingItemId, RequestId};
use crate::value_objects::media_kind::ItemKind;
use crate::value_objects::processing_status::{self, ProcessingStatus};
use crate::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingItem {
    pub id: ProcessingItemId,
    pub request_id: RequestId,
    pub kind: ItemKind,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub status: ProcessingStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub current_step: Option<String>,
    pub last_error: Option<String>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub skip_until: Option<DateTime<Utc>>,
    pub progress: u8,
    pub download_id: Option<DownloadId>,
    pub encoding_job_id: Option<EncoderAssignmentId>,
    pub source_file_path: Option<String>,
    pub step_context: ProcessingContext,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingItem {
    pub fn new_movie(request_id: RequestId, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            id: ProcessingItemId::new(),
            request_id,
            kind: ItemKind::Movie,
            season: None,
            episode: None,
            status: ProcessingStatus::Pending,
            attempts: 0,
            max_attempts,
            current_step: None,
            last_error: None,
            next_retry_at: None,
            skip_until: None,
            progress: 0,
            download_id: None,
            encoding_job_id: None,
            source_file_path: None,
            step_context: ProcessingContext::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_episode(request_id: RequestId, season: u32, episode: u32, max_attempts: u32) -> Self {
        let mut item = Self::new_movie(request_id, max_attempts);
        item.kind = ItemKind::Episode;
        item.season = Some(season);
        item.episode = Some(episode);
        item
    }

    /// Applies a validated transition. Callers (the orchestrator) must
    /// consult `processing_status::transition` themselves first if they need
    /// to branch on `InvalidTransition`; this helper does the same check and
    /// additionally stamps bookkeeping fields the transition implies.
    pub fn apply_transition(&mut self, to: ProcessingStatus) -> Result<(), PipelineError> {
        processing_status::transition(self.status, to)?;
        if to == ProcessingStatus::Pending && self.status == ProcessingStatus::Failed {
            self.attempts = 0;
            self.last_error = None;
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn record_failure(&mut self, error: impl Into<String>) -> Result<(), PipelineError> {
        self.last_error = Some(error.into());
        self.apply_transition(ProcessingStatus::Failed)
    }

    pub fn is_owned_by_active_execution(&self, execution_owner: Option<&crate::value_objects::ids::PipelineExecutionId>) -> bool {
        // Invariant 2: a non-terminal item must be owned by exactly one active
        // execution. Terminal items need no owner.
        if self.status.is_terminal() {
            true
        } else {
            execution_owner.is_some()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_to_pending_resets_attempts() {
        let mut item = ProcessingItem::new_movie(RequestId::new(), 3);
        item.attempts = 2;
        item.apply_transition(ProcessingStatus::Failed).unwrap();
        item.last_error = Some("boom".into());
        item.apply_transition(ProcessingStatus::Pending).unwrap();
        assert_eq!(item.attempts, 0);
        assert!(item.last_error.is_none());
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let mut item = ProcessingItem::new_movie(RequestId::new(), 3);
        item.status = ProcessingStatus::Completed;
        assert!(item.apply_transition(ProcessingStatus::Downloading).is_err());
    }
}
