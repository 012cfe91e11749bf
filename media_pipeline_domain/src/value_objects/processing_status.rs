// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # ProcessingItem State Machine (C1)
//!
//! Pure, side-effect-free transition rules for `ProcessingItem.status`.
//! `ProcessingItem.status` only advances along
//! `pending → searching → found → downloading → downloaded → encoding →
//! encoded → delivering → completed`; any non-terminal state may jump to
//! `failed` or `cancelled`, and `failed → pending` is the one retry edge back
//! out of a terminal-ish state (§3 invariant 1, §4.1).

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Searching,
    Found,
    Downloading,
    Downloaded,
    Encoding,
    Encoded,
    Delivering,
    Completed,
    Failed,
    Cancelled,
    /// Not part of the owning pipeline's forward sequence; set by the
    /// deliver step's TV continuation path when an episode item is folded
    /// into a successor request cycle (§4.6). Treated as terminal-positive
    /// for the purpose of invariant 6.
    Skipped,
}

/// The forward order of the happy path. Index comparison is how
/// `canTransition` distinguishes "forward" from "backward".
const FORWARD_ORDER: [ProcessingStatus; 9] = [
    ProcessingStatus::Pending,
    ProcessingStatus::Searching,
    ProcessingStatus::Found,
    ProcessingStatus::Downloading,
    ProcessingStatus::Downloaded,
    ProcessingStatus::Encoding,
    ProcessingStatus::Encoded,
    ProcessingStatus::Delivering,
    ProcessingStatus::Completed,
];

fn forward_index(status: ProcessingStatus) -> Option<usize> {
    FORWARD_ORDER.iter().position(|s| *s == status)
}

impl ProcessingStatus {
    /// `completed | failed | cancelled | skipped` cannot transition further
    /// except for `failed`'s retry edge back to `pending`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessingStatus::Completed
                | ProcessingStatus::Failed
                | ProcessingStatus::Cancelled
                | ProcessingStatus::Skipped
        )
    }

    /// Terminal states that invariant 6 treats as "done, successfully enough"
    /// for a TV request to progress toward completion.
    pub fn is_terminal_positive(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Skipped)
    }

    pub fn can_retry(&self) -> bool {
        matches!(self, ProcessingStatus::Failed)
    }

    /// A freshly-created item that has not yet been handed to a step.
    pub fn requires_validation(&self) -> bool {
        matches!(self, ProcessingStatus::Pending)
    }

    /// The next state on the happy path, if one exists (`completed` has none).
    pub fn natural_next(&self) -> Option<ProcessingStatus> {
        let idx = forward_index(*self)?;
        FORWARD_ORDER.get(idx + 1).copied()
    }

    /// All states this status may legally transition to.
    pub fn next_states(&self) -> Vec<ProcessingStatus> {
        let mut out = Vec::new();
        if let Some(idx) = forward_index(*self) {
            out.extend(FORWARD_ORDER.iter().skip(idx + 1).copied());
        }
        if !self.is_terminal() {
            out.push(ProcessingStatus::Failed);
            out.push(ProcessingStatus::Cancelled);
        }
        if matches!(self, ProcessingStatus::Failed) {
            out.push(ProcessingStatus::Pending);
        }
        out
    }

    pub fn can_transition_to(&self, to: ProcessingStatus) -> bool {
        if *self == to {
            // Replaying a no-op transition is allowed but is not itself a
            // "transition" — callers should short-circuit on equality before
            // calling this (see `transition`).
            return true;
        }
        self.next_states().contains(&to)
    }
}

/// Validates and performs a transition, or fails with `InvalidTransition`.
///
/// Replaying `transition(s, s)` is a documented no-op (§8) and always
/// succeeds without consulting the table above.
pub fn transition(from: ProcessingStatus, to: ProcessingStatus) -> Result<ProcessingStatus, PipelineError> {
    if from == to {
        return Ok(to);
    }
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(PipelineError::InvalidTransition(format!("{from:?} -> {to:?} is not a legal transition")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProcessingStatus::*;

    #[test]
    fn forward_happy_path_is_legal() {
        let mut cur = Pending;
        for next in [Searching, Found, Downloading, Downloaded, Encoding, Encoded, Delivering, Completed] {
            assert!(cur.can_transition_to(next), "{cur:?} -> {next:?}");
            cur = next;
        }
    }

    #[test]
    fn backward_transitions_are_illegal() {
        assert!(!Downloading.can_transition_to(Searching));
        assert!(!Completed.can_transition_to(Encoding));
    }

    #[test]
    fn skipping_forward_is_legal() {
        assert!(Pending.can_transition_to(Downloaded));
        assert!(Searching.can_transition_to(Completed));
    }

    #[test]
    fn any_nonterminal_can_fail_or_cancel() {
        for s in [Pending, Searching, Found, Downloading, Downloaded, Encoding, Encoded, Delivering] {
            assert!(s.can_transition_to(Failed));
            assert!(s.can_transition_to(Cancelled));
        }
    }

    #[test]
    fn only_failed_can_return_to_pending() {
        assert!(Failed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Pending));
    }

    #[test]
    fn terminal_states_reject_all_other_transitions() {
        for t in [Completed, Cancelled, Skipped] {
            for other in FORWARD_ORDER.iter().copied() {
                if other != t {
                    assert!(!t.can_transition_to(other), "{t:?} -> {other:?} should be illegal");
                }
            }
        }
    }

    #[test]
    fn replaying_same_status_is_a_no_op() {
        assert_eq!(transition(Downloading, Downloading).unwrap(), Downloading);
    }

    proptest::proptest! {
        #[test]
        fn every_recorded_transition_satisfies_can_transition(
            from_idx in 0..FORWARD_ORDER.len(),
            to_idx in 0..FORWARD_ORDER.len(),
        ) {
            let from = FORWARD_ORDER[from_idx];
            let to = FORWARD_ORDER[to_idx];
            let allowed = from.can_transition_to(to);
            proptest::prop_assert_eq!(allowed, to_idx >= from_idx);
        }
    }
}
