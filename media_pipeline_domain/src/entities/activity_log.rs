// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # ActivityLog — append-only chronological trace (§3, §7)
//!
//! §7 requires the Request's `error` field to carry the last terminal error
//! while "the ActivityLog carries a chronological trace" of everything that
//! happened. This is the append-only audit entity that backs that guarantee.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::ids::{ActivityLogId, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySeverity {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: ActivityLogId,
    pub request_id: RequestId,
    pub severity: ActivitySeverity,
    /// A short machine-stable event tag (`step.search.selected`,
    /// `dispatch.job.failed`, `recovery.stuck_item.reset`), so callers can
    /// filter the trace without parsing `message`.
    pub event: String,
    pub message: String,
    #[serde(default)]
    pub metadata: Value,
    pub recorded_at: DateTime<Utc>,
}

impl ActivityLogEntry {
    pub fn new(request_id: RequestId, severity: ActivitySeverity, event: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: ActivityLogId::new(),
            request_id,
            severity,
            event: event.into(),
            message: message.into(),
            metadata: Value::Null,
            recorded_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}
