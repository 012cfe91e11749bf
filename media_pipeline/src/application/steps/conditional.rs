// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Conditional Step (§4.2)
//!
//! A branch point: evaluates an ordered list of `(condition, next step name)`
//! pairs against the blackboard and names the first one whose condition
//! holds as `nextStep`, falling back to `defaultNext` (or stopping if none
//! is configured). A step descriptor's own `condition` field is what lets
//! the *executor* skip a step outright (§4.2); this step type is for
//! choosing among several possible next steps, not for being skipped itself.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use media_pipeline_domain::condition::{evaluate, Condition};
use media_pipeline_domain::entities::pipeline_template::StepType;
use media_pipeline_domain::step::{Step, StepExecutionInput};
use media_pipeline_domain::value_objects::step_output::StepOutput;
use media_pipeline_domain::PipelineError;

#[derive(Debug, Clone, Deserialize)]
struct Branch {
    condition: Condition,
    next: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ConditionalConfig {
    #[serde(default)]
    branches: Vec<Branch>,
    #[serde(default)]
    default_next: Option<String>,
}

pub struct ConditionalStep;

#[async_trait]
impl Step for ConditionalStep {
    fn step_type(&self) -> StepType {
        StepType::Conditional
    }

    fn validate_config(&self, config: &Value) -> Result<(), PipelineError> {
        serde_json::from_value::<ConditionalConfig>(config.clone()).map(|_| ()).map_err(|e| PipelineError::ConfigError(e.to_string()))
    }

    async fn execute(&self, input: &StepExecutionInput, config: &Value) -> Result<StepOutput, PipelineError> {
        let cfg: ConditionalConfig = serde_json::from_value(config.clone()).map_err(|e| PipelineError::ConfigError(e.to_string()))?;
        let context_json = input.context.as_json();

        let chosen = cfg.branches.iter().find(|b| evaluate(&context_json, &b.condition)).map(|b| b.next.clone()).or(cfg.default_next);

        Ok(StepOutput { success: true, next_step: Some(chosen), data: Some(context_json), ..Default::default() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_pipeline_domain::condition::{Logic, Operator, Predicate};
    use media_pipeline_domain::value_objects::ids::{PipelineExecutionId, ProcessingItemId, RequestId};
    use serde_json::json;

    fn input_with(season: u32) -> StepExecutionInput {
        let mut context = media_pipeline_domain::context::ProcessingContext::new();
        context.extra.insert("season".to_string(), json!(season));
        StepExecutionInput { request_id: RequestId::new(), item_id: ProcessingItemId::new(), execution_id: PipelineExecutionId::new(), context }
    }

    #[tokio::test]
    async fn picks_first_matching_branch() {
        let config = json!({
            "branches": [
                {"condition": {"kind": "predicate", "path": "extra.season", "operator": "eq", "value": 1}, "next": "season-one-handling"}
            ],
            "default_next": "encode"
        });
        let out = ConditionalStep.execute(&input_with(1), &config).await.unwrap();
        assert_eq!(out.next_step, Some(Some("season-one-handling".to_string())));
    }

    #[tokio::test]
    async fn falls_back_to_default_next() {
        let config = json!({"branches": [], "default_next": "encode"});
        let out = ConditionalStep.execute(&input_with(2), &config).await.unwrap();
        assert_eq!(out.next_step, Some(Some("encode".to_string())));
    }

    #[test]
    fn logic_and_operator_types_are_exercised_by_the_domain_evaluator() {
        let _ = (Logic::And, Operator::Eq, Predicate { path: "x".into(), operator: Operator::Eq, value: json!(1) });
    }
}
