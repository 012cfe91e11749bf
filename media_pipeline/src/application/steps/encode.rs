// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Encode Step (§4.5)
//!
//! Thin dispatch into the encoder fabric (C9): creates an `EncoderAssignment`
//! row (idempotent on `(inputPath, active)`, invariant 4) and pauses. The
//! fabric itself — connection table, pull-based assignment, progress cache,
//! stall detection — is infrastructure (`infrastructure::dispatch`) that
//! drains `list_pending_oldest_first`; this step never talks to a remote
//! encoder directly.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use media_pipeline_domain::entities::pipeline_template::StepType;
use media_pipeline_domain::entities::EncoderAssignment;
use media_pipeline_domain::ports::EncoderAssignmentRepository;
use media_pipeline_domain::step::{Step, StepExecutionInput};
use media_pipeline_domain::value_objects::step_output::StepOutput;
use media_pipeline_domain::PipelineError;

#[derive(Debug, Clone, Deserialize)]
struct EncodeConfig {
    profile_id: String,
    #[serde(default = "default_extension")]
    extension: String,
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
}

fn default_extension() -> String {
    "mkv".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

pub struct EncodeStep {
    assignments: std::sync::Arc<dyn EncoderAssignmentRepository>,
}

impl EncodeStep {
    pub fn new(assignments: std::sync::Arc<dyn EncoderAssignmentRepository>) -> Self {
        Self { assignments }
    }
}

#[async_trait]
impl Step for EncodeStep {
    fn step_type(&self) -> StepType {
        StepType::Encode
    }

    fn validate_config(&self, config: &Value) -> Result<(), PipelineError> {
        serde_json::from_value::<EncodeConfig>(config.clone()).map(|_| ()).map_err(|e| PipelineError::ConfigError(e.to_string()))
    }

    async fn execute(&self, input: &StepExecutionInput, config: &Value) -> Result<StepOutput, PipelineError> {
        let cfg: EncodeConfig = serde_json::from_value(config.clone()).map_err(|e| PipelineError::ConfigError(e.to_string()))?;
        let mut context = input.context.clone();

        let Some(source) = context.download.source_file_path.clone() else {
            return Ok(StepOutput::fail("encode step reached with no downloaded source file"));
        };

        if let Some(existing) = self.assignments.find_active_by_input_path(&source).await? {
            return Ok(StepOutput { success: true, should_pause: true, data: Some(serde_json::json!({"assignment_id": existing.id})), ..Default::default() });
        }

        let output_path = format!("{source}.encoded.{}", cfg.extension);
        let assignment = EncoderAssignment::new(input.item_id, source, output_path, cfg.profile_id, cfg.max_attempts);
        self.assignments.save(&assignment).await?;

        context.extra.insert("encoding_job_id".to_string(), Value::String(assignment.id.to_string()));

        Ok(StepOutput {
            success: true,
            should_pause: true,
            data: Some(context.as_json()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_pipeline_domain::value_objects::ids::{PipelineExecutionId, ProcessingItemId, RequestId};
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAssignments(Mutex<Vec<EncoderAssignment>>);
    #[async_trait]
    impl EncoderAssignmentRepository for FakeAssignments {
        async fn save(&self, assignment: &EncoderAssignment) -> Result<(), PipelineError> {
            self.0.lock().unwrap().push(assignment.clone());
            Ok(())
        }
        async fn get(&self, id: media_pipeline_domain::value_objects::ids::EncoderAssignmentId) -> Result<EncoderAssignment, PipelineError> {
            self.0.lock().unwrap().iter().find(|a| a.id == id).cloned().ok_or_else(|| PipelineError::not_found("assignment"))
        }
        async fn get_by_job_id(&self, job_id: ProcessingItemId) -> Result<Option<EncoderAssignment>, PipelineError> {
            Ok(self.0.lock().unwrap().iter().find(|a| a.job_id == job_id).cloned())
        }
        async fn find_active_by_input_path(&self, input_path: &str) -> Result<Option<EncoderAssignment>, PipelineError> {
            Ok(self.0.lock().unwrap().iter().find(|a| a.input_path == input_path).cloned())
        }
        async fn list_pending_oldest_first(&self) -> Result<Vec<EncoderAssignment>, PipelineError> {
            Ok(vec![])
        }
        async fn list_by_status(&self, _status: media_pipeline_domain::value_objects::assignment_status::AssignmentStatus) -> Result<Vec<EncoderAssignment>, PipelineError> {
            Ok(vec![])
        }
        async fn list_by_encoder(&self, _encoder_id: media_pipeline_domain::value_objects::ids::EncoderId) -> Result<Vec<EncoderAssignment>, PipelineError> {
            Ok(vec![])
        }
    }

    fn input() -> StepExecutionInput {
        let mut context = media_pipeline_domain::context::ProcessingContext::new();
        context.download.source_file_path = Some("/downloads/inception.mkv".to_string());
        StepExecutionInput { request_id: RequestId::new(), item_id: ProcessingItemId::new(), execution_id: PipelineExecutionId::new(), context }
    }

    #[tokio::test]
    async fn creates_assignment_and_pauses() {
        let assignments = std::sync::Arc::new(FakeAssignments::default());
        let step = EncodeStep::new(assignments.clone());
        let config = json!({"profile_id": "hevc-1080p"});

        let out = step.execute(&input(), &config).await.unwrap();
        assert!(out.should_pause);
        assert_eq!(assignments.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reusing_same_input_path_is_idempotent() {
        let assignments = std::sync::Arc::new(FakeAssignments::default());
        let step = EncodeStep::new(assignments.clone());
        let config = json!({"profile_id": "hevc-1080p"});

        step.execute(&input(), &config).await.unwrap();
        step.execute(&input(), &config).await.unwrap();
        assert_eq!(assignments.0.lock().unwrap().len(), 1);
    }
}
