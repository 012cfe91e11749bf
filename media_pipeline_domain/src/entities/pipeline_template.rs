// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # PipelineTemplate — the declarative step tree (§3, §4.2)
//!
//! An ordered tree of step descriptors, immutable from the engine's point of
//! view. One `is_default` template exists per `MediaKind`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::Condition;
use crate::value_objects::ids::PipelineTemplateId;
use crate::value_objects::media_kind::MediaKind;
use crate::PipelineError;

/// The step-type tag the step registry (C2) dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Search,
    Download,
    Encode,
    Deliver,
    Approval,
    Notification,
    Conditional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDescriptor {
    pub step_type: StepType,
    pub name: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub children: Vec<StepDescriptor>,
    #[serde(default)]
    pub condition: Option<Condition>,
}

impl StepDescriptor {
    pub fn new(step_type: StepType, name: impl Into<String>, config: Value) -> Self {
        Self { step_type, name: name.into(), config, children: Vec::new(), condition: None }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_children(mut self, children: Vec<StepDescriptor>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineTemplate {
    pub id: PipelineTemplateId,
    pub media_kind: MediaKind,
    pub is_default: bool,
    pub name: String,
    pub steps: Vec<StepDescriptor>,
}

impl PipelineTemplate {
    pub fn new(media_kind: MediaKind, name: impl Into<String>, steps: Vec<StepDescriptor>, is_default: bool) -> Result<Self, PipelineError> {
        if steps.is_empty() {
            return Err(PipelineError::ConfigError("pipeline template must have at least one step".into()));
        }
        Ok(Self { id: PipelineTemplateId::new(), media_kind, is_default, name: name.into(), steps })
    }

    /// The standard movie/episode template (§4.3–§4.6): search → download →
    /// encode → deliver, linear with no branches. Branch-per-episode tree
    /// construction for TV requests is the orchestrator's job (§3
    /// `PipelineExecution.parentExecutionId`), not the template's.
    ///
    /// The encode step config names `"default"` as its `profile_id` — an
    /// operator replacing this template must either keep a `"default"`
    /// entry in the dispatch profile catalog or supply their own template
    /// with a different `profile_id`. Search/download ignore their config
    /// entirely; deliver's is all `#[serde(default)]` fields, so `{}` is
    /// enough to pick up `requireAllServersSuccess: true`.
    pub fn default_linear(media_kind: MediaKind) -> Result<Self, PipelineError> {
        let steps = vec![
            StepDescriptor::new(StepType::Search, "search", Value::Null),
            StepDescriptor::new(StepType::Download, "download", Value::Null),
            StepDescriptor::new(StepType::Encode, "encode", serde_json::json!({"profile_id": "default"})),
            StepDescriptor::new(StepType::Deliver, "deliver", serde_json::json!({})),
        ];
        Self::new(media_kind, "default", steps, true)
    }

    pub fn step_by_name(&self, name: &str) -> Option<&StepDescriptor> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn step_after(&self, name: &str) -> Option<&StepDescriptor> {
        let idx = self.steps.iter().position(|s| s.name == name)?;
        self.steps.get(idx + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_is_search_download_encode_deliver() {
        let tpl = PipelineTemplate::default_linear(MediaKind::Movie).unwrap();
        let names: Vec<&str> = tpl.steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["search", "download", "encode", "deliver"]);
    }

    #[test]
    fn empty_template_is_rejected() {
        assert!(PipelineTemplate::new(MediaKind::Movie, "bad", vec![], true).is_err());
    }
}
