// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The encoder dispatch wire protocol (§6): bidirectional newline-delimited
//! JSON, every message tagged by a string `type`.

use serde::{Deserialize, Serialize};

use crate::infrastructure::config::EncodeProfile;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    Register {
        encoder_id: String,
        gpu_device: String,
        max_concurrent: u32,
        current_jobs: u32,
        hostname: String,
        version: String,
    },
    Heartbeat {
        encoder_id: String,
        current_jobs: u32,
        state: WorkerState,
    },
    #[serde(rename = "job:accepted")]
    JobAccepted {
        job_id: String,
        encoder_id: String,
    },
    #[serde(rename = "job:progress")]
    JobProgress {
        job_id: String,
        progress: u8,
        fps: Option<f32>,
        speed: Option<f32>,
        eta: Option<u64>,
        #[serde(default)]
        frame: Option<u64>,
        #[serde(default)]
        bitrate: Option<String>,
        #[serde(default)]
        total_size: Option<u64>,
        #[serde(default)]
        elapsed_time: Option<u64>,
    },
    #[serde(rename = "job:complete")]
    JobComplete {
        job_id: String,
        output_size: u64,
        compression_ratio: f32,
        duration: u64,
    },
    #[serde(rename = "job:failed")]
    JobFailed {
        job_id: String,
        error: String,
        retriable: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkerState {
    Idle,
    Encoding,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Registered,
    Pong {
        timestamp: i64,
    },
    #[serde(rename = "job:assign")]
    JobAssign {
        job_id: String,
        input_path: String,
        output_path: String,
        profile_id: String,
        profile: EncodeProfile,
    },
    #[serde(rename = "job:cancel")]
    JobCancel {
        job_id: String,
        reason: String,
    },
    #[serde(rename = "server:shutdown")]
    ServerShutdown {
        reconnect_delay: u64,
    },
}
