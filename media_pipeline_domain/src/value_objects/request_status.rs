// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The coarse, request-level status (§3). Its interaction with the granular
//! `ProcessingStatus` of child items is computed by a separate collaborator
//! (§4.9's open question) — this type only names the values and the two
//! guarantees spec.md documents directly: termination and the
//! `quality_unavailable` pause point (§4.3e).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Processing,
    /// Only alternatives (not meeting the target quality) were found; the
    /// pipeline is paused awaiting `acceptLowerQuality` (§4.3e).
    QualityUnavailable,
    Completed,
    Failed,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed | RequestStatus::Cancelled)
    }
}
