// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Notification Step (§4.2)
//!
//! Fires a collaborator notification and always succeeds synchronously —
//! there is nothing to pause for.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use media_pipeline_domain::entities::pipeline_template::StepType;
use media_pipeline_domain::ports::NotificationSink;
use media_pipeline_domain::step::{Step, StepExecutionInput};
use media_pipeline_domain::value_objects::step_output::StepOutput;
use media_pipeline_domain::PipelineError;

#[derive(Debug, Clone, Deserialize)]
struct NotificationConfig {
    subject: String,
    body: String,
}

pub struct NotificationStep {
    sink: std::sync::Arc<dyn NotificationSink>,
}

impl NotificationStep {
    pub fn new(sink: std::sync::Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Step for NotificationStep {
    fn step_type(&self) -> StepType {
        StepType::Notification
    }

    fn validate_config(&self, config: &Value) -> Result<(), PipelineError> {
        serde_json::from_value::<NotificationConfig>(config.clone()).map(|_| ()).map_err(|e| PipelineError::ConfigError(e.to_string()))
    }

    async fn execute(&self, input: &StepExecutionInput, config: &Value) -> Result<StepOutput, PipelineError> {
        let cfg: NotificationConfig = serde_json::from_value(config.clone()).map_err(|e| PipelineError::ConfigError(e.to_string()))?;
        self.sink.notify(&cfg.subject, &cfg.body).await?;
        Ok(StepOutput::ok_with_data(input.context.as_json()))
    }
}
