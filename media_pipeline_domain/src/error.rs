// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A single error enum shared by the state machine, the step contracts, the
//! orchestrator, and the encoder dispatch fabric. Categorizing every failure
//! into one of these variants lets callers decide, in one place, whether a
//! failure is worth retrying (`is_recoverable`) or must surface as a terminal
//! `ProcessingItem` failure.

use thiserror::Error;

/// Domain-specific errors for the media pipeline control plane.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// A `ProcessingItem`/`EncoderAssignment` transition was attempted that
    /// the state machine (C1) does not allow.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A step or template declared configuration the registry (C2) rejected.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// A lookup (request, item, template, assignment, encoder) found nothing.
    #[error("not found: {0}")]
    NotFound(String),

    /// An operation's preconditions were not met (e.g. retrying a non-failed
    /// item, accepting quality on a request that isn't `quality_unavailable`).
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// The call targeted a service whose circuit breaker (C8) is OPEN.
    #[error("external service unavailable: {0}")]
    ExternalUnavailable(String),

    /// An operation exceeded its allotted time (heartbeat, stall, DB retry).
    #[error("timeout: {0}")]
    Timeout(String),

    /// The remote encoder owning a job disconnected before it could respond.
    #[error("worker disconnected: {0}")]
    WorkerDisconnected(String),

    /// An enqueue request was coalesced onto an existing in-flight row.
    #[error("duplicate work coalesced: {0}")]
    DuplicateWork(String),

    /// No server-prefix → remote-prefix mapping matched a path.
    #[error("path translation error: {0}")]
    PathTranslationError(String),

    /// A persisted invariant (§3) was found violated. Never swallow this.
    #[error("integrity violation: {0}")]
    IntegrityError(String),

    /// Infrastructure I/O failure (filesystem, transport).
    #[error("io error: {0}")]
    Io(String),

    /// Infrastructure persistence failure.
    #[error("database error: {0}")]
    Database(String),

    /// (De)serialization failure (context blob, wire protocol message).
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Catch-all for conditions that should never happen.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Whether a caller may retry the operation that produced this error.
    ///
    /// Mirrors §7's policy: network hiccups and stalls under attempt budget
    /// recover locally; invariant violations and security-adjacent failures
    /// never do.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::Timeout(_)
                | PipelineError::ExternalUnavailable(_)
                | PipelineError::WorkerDisconnected(_)
                | PipelineError::Io(_)
        )
    }

    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::InvalidTransition(_) => "state_machine",
            PipelineError::ConfigError(_) => "configuration",
            PipelineError::NotFound(_) => "not_found",
            PipelineError::PreconditionFailed(_) => "precondition",
            PipelineError::ExternalUnavailable(_) => "external",
            PipelineError::Timeout(_) => "timeout",
            PipelineError::WorkerDisconnected(_) => "worker",
            PipelineError::DuplicateWork(_) => "duplicate",
            PipelineError::PathTranslationError(_) => "path_translation",
            PipelineError::IntegrityError(_) => "integrity",
            PipelineError::Io(_) => "io",
            PipelineError::Database(_) => "database",
            PipelineError::Serialization(_) => "serialization",
            PipelineError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}
