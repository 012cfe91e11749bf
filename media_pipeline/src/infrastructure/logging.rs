// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Span conventions for the engine's three hot paths: step execution,
//! encoder dispatch events, and recovery sweeps. `media_pipeline_bootstrap`
//! owns the subscriber installer and early-startup `BootstrapLogger`; this
//! module is what the running engine reaches for once that subscriber is up.

use tracing::{info_span, Span};

use media_pipeline_domain::value_objects::ids::{ProcessingItemId, RequestId};

/// Wraps one step's execution: `request_id`, `item_id`, `step`.
pub fn step_span(request_id: RequestId, item_id: ProcessingItemId, step: &str) -> Span {
    info_span!("step", request_id = %request_id, item_id = %item_id, step)
}

/// Wraps one encoder dispatch event: `encoder_id`, `job_id`.
pub fn dispatch_span(encoder_id: &str, job_id: &str) -> Span {
    info_span!("dispatch", encoder_id, job_id)
}

/// Wraps one recovery worker sweep; `items_examined`/`items_repaired` are
/// recorded on the span once the sweep completes via `Span::record`.
pub fn recovery_sweep_span(worker: &'static str) -> Span {
    info_span!("recovery_sweep", worker, items_examined = tracing::field::Empty, items_repaired = tracing::field::Empty)
}
