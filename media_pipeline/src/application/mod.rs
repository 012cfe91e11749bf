// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Layer
//!
//! Use-case orchestration over the domain's ports: the step registry (C2),
//! step bodies (C4), the executor (C5), the orchestrator façade (C6),
//! recovery workers (C7), the circuit breaker service (C8), the scheduler
//! (C10), and delivery naming (C11). Nothing here talks to sqlx, axum, or a
//! wire format directly — those live in `infrastructure` and are reached
//! exclusively through the domain's repository/collaborator traits.

pub mod application_root;
pub mod circuit_breaker_service;
pub mod events;
pub mod executor;
pub mod media_selection;
pub mod naming;
pub mod orchestrator;
pub mod recovery;
pub mod scheduler;
pub mod step_registry;
pub mod steps;
pub mod transitions;

pub use application_root::Application;
pub use events::{PipelineEvent, ResumeReceiver, ResumeSender};
