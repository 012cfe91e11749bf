// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Contract (C2/C4, §4.2)
//!
//! Every step type implements `Step`: it validates its own configuration at
//! template-load time and, given the current blackboard and that
//! configuration, produces a [`StepOutput`](crate::value_objects::step_output::StepOutput).
//! Concrete step bodies (search/download/encode/deliver/approval/
//! notification/conditional) live in the application crate, alongside the
//! collaborators they call out to (indexer, torrent client, encoder dispatch,
//! delivery transport) — this trait is the seam between them and the
//! executor (C5), which is why it lives in the dependency-free domain crate.

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ProcessingContext;
use crate::error::PipelineError;
use crate::value_objects::step_output::StepOutput;

/// Everything a step needs to know about the item it is advancing, beyond
/// the blackboard context itself. Steps never write `ProcessingItem` directly
/// — the orchestrator's `transitionStatus` is the only writer (§4.7) — so this
/// is a read-only view assembled by the executor for the duration of one call.
#[derive(Debug, Clone)]
pub struct StepExecutionInput {
    pub request_id: crate::value_objects::ids::RequestId,
    pub item_id: crate::value_objects::ids::ProcessingItemId,
    pub execution_id: crate::value_objects::ids::PipelineExecutionId,
    pub context: ProcessingContext,
}

#[async_trait]
pub trait Step: Send + Sync {
    /// The step-type tag this implementation answers for, matching
    /// `PipelineTemplate::StepType` (C2's registry key).
    fn step_type(&self) -> crate::entities::pipeline_template::StepType;

    /// Validates a step descriptor's `config` blob at template load time;
    /// rejects malformed configuration before any request ever reaches it.
    fn validate_config(&self, config: &Value) -> Result<(), PipelineError>;

    /// Executes one step invocation (§4.2's `StepOutput` contract).
    async fn execute(&self, input: &StepExecutionInput, config: &Value) -> Result<StepOutput, PipelineError>;
}
