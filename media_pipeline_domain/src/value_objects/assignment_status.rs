// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `EncoderAssignment` lifecycle (§4.5's state machine diagram):
//!
//! ```text
//!   pending ──(assign)──► encoding ──(complete)──► completed
//!      ▲                     │
//!      │                     ├─(fail, retriable, attempts left)─► pending
//!      │                     ├─(fail, final) ─────────────────► failed
//!      │                     ├─(stall, attempts left) ────────► pending
//!      │                     └─(cancel) ──────────────────────► cancelled
//!      │
//!   (encoder disconnect with attempts left)
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Encoding,
    Completed,
    Failed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, AssignmentStatus::Pending | AssignmentStatus::Encoding)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentStatus::Completed | AssignmentStatus::Failed | AssignmentStatus::Cancelled)
    }

    pub fn can_transition_to(&self, to: AssignmentStatus) -> bool {
        use AssignmentStatus::*;
        matches!(
            (self, to),
            (Pending, Encoding)
                | (Encoding, Completed)
                | (Encoding, Pending) // retry after failure/stall/disconnect
                | (Encoding, Failed)
                | (Pending, Cancelled)
                | (Encoding, Cancelled)
        )
    }
}

pub fn transition(from: AssignmentStatus, to: AssignmentStatus) -> Result<AssignmentStatus, PipelineError> {
    if from == to {
        return Ok(to);
    }
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(PipelineError::InvalidTransition(format!(
            "assignment {from:?} -> {to:?} is not a legal transition"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AssignmentStatus::*;

    #[test]
    fn happy_path() {
        assert!(transition(Pending, Encoding).is_ok());
        assert!(transition(Encoding, Completed).is_ok());
    }

    #[test]
    fn retry_paths() {
        assert!(transition(Encoding, Pending).is_ok());
        assert!(transition(Encoding, Failed).is_ok());
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(transition(Completed, Pending).is_err());
        assert!(transition(Failed, Pending).is_err());
        assert!(transition(Cancelled, Encoding).is_err());
    }
}
