// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Approval Step (§4.2)
//!
//! A human-in-the-loop gate: pauses with a freshly minted approval id until
//! `approveDiscoveredItem` (C6) writes `context.approval.approved` and
//! resumes the execution. The step itself never decides approval.

use async_trait::async_trait;
use serde_json::{json, Value};
use ulid::Ulid;

use media_pipeline_domain::entities::pipeline_template::StepType;
use media_pipeline_domain::step::{Step, StepExecutionInput};
use media_pipeline_domain::value_objects::step_output::StepOutput;
use media_pipeline_domain::PipelineError;

pub struct ApprovalStep;

#[async_trait]
impl Step for ApprovalStep {
    fn step_type(&self) -> StepType {
        StepType::Approval
    }

    fn validate_config(&self, _config: &Value) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn execute(&self, input: &StepExecutionInput, _config: &Value) -> Result<StepOutput, PipelineError> {
        let mut context = input.context.clone();

        if context.approval.approved {
            return Ok(StepOutput::ok_with_data(context.as_json()));
        }

        if context.approval.approval_id.is_none() {
            context.approval.approval_id = Some(Ulid::new().to_string());
        }

        Ok(StepOutput { success: true, should_pause: true, data: Some(json!({"approval": context.approval})), ..Default::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_pipeline_domain::value_objects::ids::{PipelineExecutionId, ProcessingItemId, RequestId};

    fn input() -> StepExecutionInput {
        StepExecutionInput {
            request_id: RequestId::new(),
            item_id: ProcessingItemId::new(),
            execution_id: PipelineExecutionId::new(),
            context: media_pipeline_domain::context::ProcessingContext::new(),
        }
    }

    #[tokio::test]
    async fn unapproved_pauses_with_a_fresh_approval_id() {
        let out = ApprovalStep.execute(&input(), &Value::Null).await.unwrap();
        assert!(out.should_pause);
        assert!(out.data.unwrap()["approval"]["approval_id"].is_string());
    }

    #[tokio::test]
    async fn approved_context_proceeds() {
        let mut context = media_pipeline_domain::context::ProcessingContext::new();
        context.approval.approved = true;
        let input = StepExecutionInput { request_id: RequestId::new(), item_id: ProcessingItemId::new(), execution_id: PipelineExecutionId::new(), context };
        let out = ApprovalStep.execute(&input, &Value::Null).await.unwrap();
        assert!(!out.should_pause);
    }
}
