// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Entities: objects with identity that persists through state changes.

pub mod activity_log;
pub mod circuit_breaker;
pub mod download;
pub mod encoder_assignment;
pub mod library_item;
pub mod pipeline_execution;
pub mod pipeline_template;
pub mod processing_item;
pub mod remote_encoder;
pub mod request;

pub use activity_log::{ActivityLogEntry, ActivitySeverity};
pub use circuit_breaker::{BreakerConfig, BreakerState, CircuitBreaker};
pub use download::{Download, DownloadState};
pub use encoder_assignment::EncoderAssignment;
pub use library_item::LibraryItem;
pub use pipeline_execution::{ExecutionStatus, PipelineExecution};
pub use pipeline_template::{PipelineTemplate, StepDescriptor, StepType};
pub use processing_item::ProcessingItem;
pub use remote_encoder::{EncoderStatus, RemoteEncoder};
pub use request::Request;
