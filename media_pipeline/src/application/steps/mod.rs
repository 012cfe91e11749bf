// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Step Bodies (C4, §4.3–§4.6)
//!
//! One module per step type, each implementing `media_pipeline_domain::step::Step`.
//! The entry/exit `ProcessingStatus` each step's invocation straddles is the
//! executor's job (`application::executor`), not the step's — a step only
//! ever reads the blackboard `ProcessingContext` it's handed and returns a
//! `StepOutput`; it never calls `transitionStatus` itself.

pub mod approval;
pub mod conditional;
pub mod deliver;
pub mod download;
pub mod encode;
pub mod notification;
pub mod search;

pub use approval::ApprovalStep;
pub use conditional::ConditionalStep;
pub use deliver::DeliverStep;
pub use download::DownloadStep;
pub use encode::EncodeStep;
pub use notification::NotificationStep;
pub use search::SearchStep;
