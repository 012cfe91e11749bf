// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # RemoteEncoder — the persisted view of a worker (§3)
//!
//! The in-memory connection table is authoritative during steady state; this
//! row is the reconciliation source at reconnect/restart (invariant 5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::ids::EncoderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderStatus {
    Idle,
    Encoding,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEncoder {
    pub encoder_id: EncoderId,
    pub gpu_device: String,
    pub max_concurrent: u32,
    pub current_jobs: u32,
    pub status: EncoderStatus,
    pub hostname: String,
    pub version: String,
    pub total_completed: u64,
    pub total_failed: u64,
    pub last_heartbeat: DateTime<Utc>,
}

impl RemoteEncoder {
    pub fn register(encoder_id: EncoderId, gpu_device: String, max_concurrent: u32, current_jobs: u32, hostname: String, version: String) -> Self {
        Self {
            encoder_id,
            gpu_device,
            max_concurrent,
            current_jobs,
            status: if current_jobs > 0 { EncoderStatus::Encoding } else { EncoderStatus::Idle },
            hostname,
            version,
            total_completed: 0,
            total_failed: 0,
            last_heartbeat: Utc::now(),
        }
    }

    pub fn spare_capacity(&self) -> u32 {
        self.max_concurrent.saturating_sub(self.current_jobs)
    }

    pub fn has_capacity(&self) -> bool {
        self.spare_capacity() > 0
    }

    pub fn heartbeat(&mut self, current_jobs: u32) {
        self.current_jobs = current_jobs;
        self.last_heartbeat = Utc::now();
        if self.status != EncoderStatus::Offline {
            self.status = if current_jobs > 0 { EncoderStatus::Encoding } else { EncoderStatus::Idle };
        }
    }

    pub fn mark_offline(&mut self) {
        self.status = EncoderStatus::Offline;
        self.current_jobs = 0;
    }

    pub fn take_job(&mut self) {
        self.current_jobs += 1;
        self.status = EncoderStatus::Encoding;
    }

    pub fn release_job(&mut self) {
        self.current_jobs = self.current_jobs.saturating_sub(1);
        if self.current_jobs == 0 && self.status != EncoderStatus::Offline {
            self.status = EncoderStatus::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_concurrent_zero_has_no_capacity() {
        let e = RemoteEncoder::register(EncoderId::new(), "cuda:0".into(), 0, 0, "h".into(), "1.0".into());
        assert!(!e.has_capacity());
    }
}
