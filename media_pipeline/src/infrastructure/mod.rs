// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Adapters for every port the domain crate declares: sqlx/SQLite
//! repositories, HTTP collaborator clients, the encoder dispatch fabric
//! (C9), configuration loading, logging setup, and metrics. Nothing in
//! `application` depends on this module directly — `main.rs` is the only
//! caller, wiring adapters into `Arc<dyn Trait>` values before handing them
//! to `application::Application::new`.

pub mod clients;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod logging;
pub mod metrics;
pub mod notifications;
pub mod repositories;
