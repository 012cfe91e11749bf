// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # PipelineExecution — one in-flight traversal of a template (§3)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::ProcessingContext;
use crate::value_objects::ids::{PipelineExecutionId, PipelineTemplateId, ProcessingItemId, RequestId};
use crate::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineExecution {
    pub id: PipelineExecutionId,
    pub request_id: RequestId,
    pub template_id: PipelineTemplateId,
    pub parent_execution_id: Option<PipelineExecutionId>,
    /// The `ProcessingItem` this execution (root or branch) is driving.
    pub item_id: ProcessingItemId,
    pub status: ExecutionStatus,
    pub current_step_index: usize,
    pub context: ProcessingContext,
    /// Correlation id the executor stored when it suspended (download id,
    /// encoder job id, approval id) — §4.2/§9's "typed task + event" model
    /// for what would otherwise be a coroutine yield point.
    pub pause_correlation_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PipelineExecution {
    pub fn new_root(request_id: RequestId, template_id: PipelineTemplateId, item_id: ProcessingItemId) -> Self {
        let now = Utc::now();
        Self {
            id: PipelineExecutionId::new(),
            request_id,
            template_id,
            parent_execution_id: None,
            item_id,
            status: ExecutionStatus::Running,
            current_step_index: 0,
            context: ProcessingContext::new(),
            pause_correlation_id: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn new_branch(parent: &PipelineExecution, item_id: ProcessingItemId) -> Self {
        let mut exec = Self::new_root(parent.request_id, parent.template_id, item_id);
        exec.parent_execution_id = Some(parent.id);
        exec
    }

    pub fn suspend(&mut self, correlation_id: impl Into<String>) {
        self.status = ExecutionStatus::Paused;
        self.pause_correlation_id = Some(correlation_id.into());
        self.updated_at = Utc::now();
    }

    /// Resumes a paused execution, consuming its correlation id. Fails if the
    /// execution is not currently paused — a cancelled execution's next
    /// resumption attempt must see the terminal state and no-op (§5).
    pub fn resume(&mut self) -> Result<(), PipelineError> {
        if self.status.is_terminal() {
            return Err(PipelineError::PreconditionFailed(format!(
                "execution {} is terminal ({:?}), cannot resume",
                self.id, self.status
            )));
        }
        self.status = ExecutionStatus::Running;
        self.pause_correlation_id = None;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn advance_step(&mut self) {
        self.current_step_index += 1;
        self.updated_at = Utc::now();
    }

    pub fn finish(&mut self, status: ExecutionStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_execution_rejects_resume() {
        let mut exec = PipelineExecution::new_root(RequestId::new(), PipelineTemplateId::new(), ProcessingItemId::new());
        exec.finish(ExecutionStatus::Cancelled);
        assert!(exec.resume().is_err());
    }

    #[test]
    fn suspend_then_resume_clears_correlation_id() {
        let mut exec = PipelineExecution::new_root(RequestId::new(), PipelineTemplateId::new(), ProcessingItemId::new());
        exec.suspend("download-123");
        assert_eq!(exec.status, ExecutionStatus::Paused);
        exec.resume().unwrap();
        assert!(exec.pause_correlation_id.is_none());
        assert_eq!(exec.status, ExecutionStatus::Running);
    }
}
