// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Media Pipeline
//!
//! A media-ingestion control plane: it takes a user's request for a movie or
//! TV episode and drives it through release discovery, bulk download,
//! hardware-accelerated transcoding on a pool of remote encoder workers, and
//! delivery to one or more storage servers — tolerating process restarts,
//! worker crashes, partial failures, and arbitrarily long-running external
//! operations along the way.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Presentation (bootstrap)                  │
//! │  CLI entry point lives in media-pipeline-bootstrap; this     │
//! │  crate's `main` only wires the Application root together.    │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Application Layer                      │
//! │  Step registry (C2), step bodies (C4), the executor (C5),    │
//! │  the orchestrator façade (C6), recovery workers (C7), the    │
//! │  circuit breaker service (C8), the scheduler (C10), and      │
//! │  delivery & naming (C11).                                    │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                          │
//! │  `media_pipeline_domain`: entities, value objects, the state │
//! │  machine, the blackboard context, the step contract, and the │
//! │  repository/collaborator port traits.                        │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Infrastructure Layer                      │
//! │  sqlx/SQLite repositories, the encoder dispatch fabric (C9)  │
//! │  as an axum WebSocket service, HTTP collaborator adapters,   │
//! │  structured logging, configuration, and metrics.             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Indexer/search HTTP clients, torrent-client bindings, the SFTP/rsync
//! transport, the FFmpeg invocation inside a remote worker, metadata
//! providers, authentication, the UI/tRPC surface, CLI argument parsing, and
//! notification sinks are external collaborators: this crate implements only
//! the narrow trait-bound seam each of them crosses.

pub mod application;
pub mod infrastructure;

pub use media_pipeline_domain::{PipelineError, ProcessingContext};
