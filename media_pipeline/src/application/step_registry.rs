// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Registry (C2, §4.2)
//!
//! Maps a `StepType` tag to the `Step` implementation that executes it, and
//! validates every step descriptor in a template against its implementation
//! at load time rather than discovering a malformed config mid-run.

use std::collections::HashMap;
use std::sync::Arc;

use media_pipeline_domain::entities::{PipelineTemplate, StepType};
use media_pipeline_domain::step::Step;
use media_pipeline_domain::PipelineError;

#[derive(Default)]
pub struct StepRegistry {
    steps: HashMap<StepType, Arc<dyn Step>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, step: Arc<dyn Step>) {
        self.steps.insert(step.step_type(), step);
    }

    pub fn get(&self, step_type: StepType) -> Result<Arc<dyn Step>, PipelineError> {
        self.steps
            .get(&step_type)
            .cloned()
            .ok_or_else(|| PipelineError::ConfigError(format!("no step registered for {step_type:?}")))
    }

    /// Walks every descriptor in `template` (depth-first, including
    /// children) and validates its `config` against the registered
    /// implementation, failing the whole template on the first bad one.
    pub fn validate_template(&self, template: &PipelineTemplate) -> Result<(), PipelineError> {
        fn walk(registry: &StepRegistry, steps: &[media_pipeline_domain::entities::StepDescriptor]) -> Result<(), PipelineError> {
            for descriptor in steps {
                let step = registry.get(descriptor.step_type)?;
                step.validate_config(&descriptor.config).map_err(|e| {
                    PipelineError::ConfigError(format!("step '{}' ({:?}): {e}", descriptor.name, descriptor.step_type))
                })?;
                walk(registry, &descriptor.children)?;
            }
            Ok(())
        }
        walk(self, &template.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use media_pipeline_domain::step::StepExecutionInput;
    use media_pipeline_domain::value_objects::step_output::StepOutput;
    use serde_json::Value;

    struct AlwaysOk;

    #[async_trait]
    impl Step for AlwaysOk {
        fn step_type(&self) -> StepType {
            StepType::Notification
        }
        fn validate_config(&self, _config: &Value) -> Result<(), PipelineError> {
            Ok(())
        }
        async fn execute(&self, _input: &StepExecutionInput, _config: &Value) -> Result<StepOutput, PipelineError> {
            Ok(StepOutput::ok())
        }
    }

    #[test]
    fn unregistered_step_type_is_a_config_error() {
        let registry = StepRegistry::new();
        assert!(registry.get(StepType::Search).is_err());
    }

    #[test]
    fn registered_step_round_trips() {
        let mut registry = StepRegistry::new();
        registry.register(Arc::new(AlwaysOk));
        assert!(registry.get(StepType::Notification).is_ok());
    }
}
