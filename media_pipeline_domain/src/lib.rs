// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Media Pipeline Domain
//!
//! Pure domain layer for the media-ingestion control plane: the entities
//! (`Request`, `ProcessingItem`, `PipelineTemplate`, `PipelineExecution`,
//! `EncoderAssignment`, `RemoteEncoder`, `CircuitBreaker`, `Download`,
//! `ActivityLogEntry`, `LibraryItem`), their value objects, the
//! `ProcessingItem` state machine (C1), the blackboard `ProcessingContext`
//! (C3), the condition evaluator (§4.2), the step contract (C2/C4's
//! interface only — implementations live in `media_pipeline`), and the
//! repository/collaborator port traits (§6).
//!
//! Nothing here depends on tokio's runtime, sqlx, or a wire format beyond
//! `serde_json` for the blackboard's open map — nothing in this crate can
//! run an I/O operation itself, it can only describe the shape of one.

pub mod condition;
pub mod context;
pub mod entities;
pub mod error;
pub mod ports;
pub mod step;
pub mod value_objects;

pub use context::ProcessingContext;
pub use error::PipelineError;
