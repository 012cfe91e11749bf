// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The contract every step returns to the executor (§4.2).

use serde_json::Value;

/// `StepOutput = { success, shouldRetry?, shouldPause?, nextStep?, data?, error? }`.
///
/// A step that needs to wait externally sets `pause` with a correlation id
/// recorded elsewhere (on the item/execution, not here) so the executor can
/// persist the execution as `paused` and exit the hot loop.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub success: bool,
    pub should_retry: bool,
    pub should_pause: bool,
    /// `Some(None)` communicates an explicit "stop, no next step" (e.g. the
    /// search step's quality-gate pause, §4.3e); `None` means "use the
    /// template's natural next step".
    pub next_step: Option<Option<String>>,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl StepOutput {
    pub fn ok() -> Self {
        Self { success: true, ..Default::default() }
    }

    pub fn ok_with_data(data: Value) -> Self {
        Self { success: true, data: Some(data), ..Default::default() }
    }

    pub fn retry(error: impl Into<String>) -> Self {
        Self { success: false, should_retry: true, error: Some(error.into()), ..Default::default() }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self { success: false, should_retry: false, error: Some(error.into()), ..Default::default() }
    }

    pub fn pause() -> Self {
        Self { success: true, should_pause: true, ..Default::default() }
    }

    pub fn paused_without_next(mut self) -> Self {
        self.next_step = Some(None);
        self
    }
}
