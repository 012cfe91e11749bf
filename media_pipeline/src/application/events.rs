// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resume Event Bus
//!
//! A step that suspends (§4.2, §9) hands its correlation id to a collaborator
//! — the download poller, the encoder dispatch fabric, an approval mutation —
//! that later needs to wake the paused execution back up. Rather than giving
//! those collaborators a direct handle to the executor (which would make
//! `EncoderDispatch` and `PipelineExecutor` own each other), they each hold a
//! clone of a bounded [`ResumeSender`] and post a [`PipelineEvent`]; a single
//! background task owned by the [`Application`](crate::application::Application)
//! root drains the [`ResumeReceiver`] and calls back into the executor. This
//! is the "typed tasks + events" resume model §9 calls for, made concrete.

use media_pipeline_domain::value_objects::ids::{EncoderAssignmentId, PipelineExecutionId, ProcessingItemId};

/// Something happened that may let a paused execution continue.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A download collaborator observed a torrent reach 100% and resolved
    /// its content path for `item_id` (§4.4).
    DownloadCompleted { item_id: ProcessingItemId, source_file_path: String },
    /// The encoder dispatch fabric resolved (or failed) a transcoding job
    /// for `item_id` (§4.5's `job:complete` / `job:failed`).
    EncodeCompleted { item_id: ProcessingItemId, assignment_id: EncoderAssignmentId },
    EncodeFailed { item_id: ProcessingItemId, assignment_id: EncoderAssignmentId, error: String },
    /// A user-facing mutation (`approveDiscoveredItem`, `acceptLowerQuality`,
    /// `overrideDiscoveredRelease`) supplied the missing input an
    /// `Approval` step was paused on.
    ApprovalGranted { item_id: ProcessingItemId, approval_id: String },
    /// `cancel`/`cancelItem` reached an execution that was paused rather
    /// than running; the resume loop must still observe the terminal write.
    Cancelled { execution_id: PipelineExecutionId },
    /// The deliver step's TV continuation path (§4.6) scheduled a fresh
    /// pipeline execution for a request's remaining episode items; the
    /// small delay it asked for has now elapsed.
    TvContinuationDue { request_id: media_pipeline_domain::value_objects::ids::RequestId },
}

pub type ResumeSender = tokio::sync::mpsc::Sender<PipelineEvent>;
pub type ResumeReceiver = tokio::sync::mpsc::Receiver<PipelineEvent>;

/// Creates the bounded channel the application root and every suspend-aware
/// collaborator share. `capacity` is the CLI's `--channel-depth` (default
/// 256) — deliberately small: a full channel means the resume loop has
/// fallen behind, which should show up as backpressure, not unbounded
/// memory growth.
pub fn resume_channel(capacity: usize) -> (ResumeSender, ResumeReceiver) {
    tokio::sync::mpsc::channel(capacity)
}
