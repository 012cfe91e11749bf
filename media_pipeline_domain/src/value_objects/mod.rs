// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Value objects: immutable types identified by their attributes, not by an id.

pub mod assignment_status;
pub mod ids;
pub mod media_kind;
pub mod processing_status;
pub mod release;
pub mod request_status;
pub mod step_output;

pub use assignment_status::AssignmentStatus;
pub use ids::{
    ActivityLogId, DownloadId, EncoderAssignmentId, EncoderId, PipelineExecutionId, PipelineTemplateId,
    ProcessingItemId, RequestId, ServerId,
};
pub use media_kind::{ItemKind, MediaKind};
pub use processing_status::ProcessingStatus;
pub use release::{Codec, QualityTarget, RankedReleases, Release, Resolution};
pub use request_status::RequestStatus;
pub use step_output::StepOutput;
