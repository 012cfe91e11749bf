// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed, ULID-backed identifiers for every aggregate. One macro keeps the
//! boilerplate (serde, `Display`, `FromStr`, ordering by creation time since
//! a ULID's prefix is a timestamp) common to all of them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

macro_rules! ulid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(ulid::Ulid);

        impl $name {
            pub fn new() -> Self {
                Self(ulid::Ulid::new())
            }

            pub fn from_ulid(u: ulid::Ulid) -> Self {
                Self(u)
            }

            pub fn as_ulid(&self) -> ulid::Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = PipelineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                ulid::Ulid::from_string(s)
                    .map($name)
                    .map_err(|e| PipelineError::ConfigError(format!("invalid {}: {e}", stringify!($name))))
            }
        }
    };
}

ulid_id!(RequestId);
ulid_id!(ProcessingItemId);
ulid_id!(PipelineTemplateId);
ulid_id!(PipelineExecutionId);
ulid_id!(EncoderAssignmentId);
ulid_id!(EncoderId);
ulid_id!(DownloadId);
ulid_id!(ServerId);
ulid_id!(ActivityLogId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_string() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-ulid".parse::<RequestId>().is_err());
    }
}
