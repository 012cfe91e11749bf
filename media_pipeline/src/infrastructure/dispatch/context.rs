// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The state every dispatch task — the websocket handler, the assignment
//! sweep, the stall detector — shares a handle to. Grouped the same way
//! `application_root`'s `Repositories`/`Collaborators` are, so constructors
//! read as "here are the ports" rather than an undifferentiated parameter
//! wall.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use media_pipeline_domain::ports::{EncoderAssignmentRepository, RemoteEncoderRepository};

use crate::infrastructure::config::EncodeProfile;

use super::connections::ConnectionRegistry;
use super::path_translation::PathTranslator;
use super::progress::ProgressCache;

#[derive(Clone)]
pub struct DispatchContext {
    pub assignments: Arc<dyn EncoderAssignmentRepository>,
    pub encoders: Arc<dyn RemoteEncoderRepository>,
    pub connections: Arc<ConnectionRegistry>,
    pub progress: Arc<ProgressCache>,
    pub translator: Arc<PathTranslator>,
    pub profiles: Arc<HashMap<String, EncodeProfile>>,
    pub heartbeat_timeout: Duration,
    pub job_stall_timeout: Duration,
}
