// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # EncoderAssignment — a transcoding job's lifecycle (§3, §4.5)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::assignment_status::{self, AssignmentStatus};
use crate::value_objects::ids::{EncoderAssignmentId, EncoderId, ProcessingItemId};
use crate::PipelineError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderAssignment {
    pub id: EncoderAssignmentId,
    pub job_id: ProcessingItemId,
    pub encoder_id: Option<EncoderId>,
    pub input_path: String,
    pub output_path: String,
    pub profile_id: String,
    pub status: AssignmentStatus,
    pub attempt: u32,
    pub max_attempts: u32,
    pub progress: u8,
    pub fps: Option<f32>,
    pub speed: Option<f32>,
    pub eta: Option<u64>,
    pub output_size: Option<u64>,
    pub compression_ratio: Option<f32>,
    pub encode_duration: Option<u64>,
    pub error: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EncoderAssignment {
    pub fn new(job_id: ProcessingItemId, input_path: impl Into<String>, output_path: impl Into<String>, profile_id: impl Into<String>, max_attempts: u32) -> Self {
        Self {
            id: EncoderAssignmentId::new(),
            job_id,
            encoder_id: None,
            input_path: input_path.into(),
            output_path: output_path.into(),
            profile_id: profile_id.into(),
            status: AssignmentStatus::Pending,
            attempt: 1,
            max_attempts,
            progress: 0,
            fps: None,
            speed: None,
            eta: None,
            output_size: None,
            compression_ratio: None,
            encode_duration: None,
            error: None,
            assigned_at: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn assign_to(&mut self, encoder_id: EncoderId) -> Result<(), PipelineError> {
        assignment_status::transition(self.status, AssignmentStatus::Encoding)?;
        self.status = AssignmentStatus::Encoding;
        self.encoder_id = Some(encoder_id);
        let now = Utc::now();
        self.assigned_at = Some(now);
        self.started_at = Some(now);
        Ok(())
    }

    pub fn apply_progress(&mut self, progress: u8, fps: Option<f32>, speed: Option<f32>, eta: Option<u64>) {
        self.progress = progress;
        self.fps = fps;
        self.speed = speed;
        self.eta = eta;
    }

    pub fn complete(&mut self, output_size: u64, compression_ratio: f32, duration_secs: u64) -> Result<(), PipelineError> {
        assignment_status::transition(self.status, AssignmentStatus::Completed)?;
        self.status = AssignmentStatus::Completed;
        self.progress = 100;
        self.output_size = Some(output_size);
        self.compression_ratio = Some(compression_ratio);
        self.encode_duration = Some(duration_secs);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Whether this assignment has retry budget remaining.
    pub fn can_retry(&self) -> bool {
        self.attempt < self.max_attempts
    }

    /// Resets for a retry attempt (failure, stall, or disconnect recovery).
    pub fn reset_for_retry(&mut self, new_encoder: Option<EncoderId>) -> Result<(), PipelineError> {
        assignment_status::transition(self.status, AssignmentStatus::Pending)?;
        self.status = AssignmentStatus::Pending;
        self.attempt += 1;
        self.progress = 0;
        self.fps = None;
        self.speed = None;
        self.eta = None;
        self.error = None;
        self.encoder_id = new_encoder;
        self.assigned_at = None;
        self.started_at = None;
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), PipelineError> {
        assignment_status::transition(self.status, AssignmentStatus::Failed)?;
        self.status = AssignmentStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), PipelineError> {
        assignment_status::transition(self.status, AssignmentStatus::Cancelled)?;
        self.status = AssignmentStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}
