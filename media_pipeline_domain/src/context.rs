// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Context — the typed blackboard (C3)
//!
//! `ProcessingItem.stepContext` is an open map with reserved keys `search`,
//! `download`, `encode`, `deliver`, `approval`, each set only by its own
//! step on success; later steps treat earlier keys as read-only (§3
//! invariant 3). Per the design notes (§9), this is modeled as a struct with
//! typed fields for the reserved sub-objects and an open map for anything
//! else a custom step wants to stash, rather than a fully dynamic map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value_objects::release::Release;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchContext {
    pub selected_release: Option<Release>,
    pub existing_download: Option<ExistingDownload>,
    pub available_releases: Vec<Release>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingDownload {
    pub download_id: String,
    pub source_file_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadContext {
    pub source_file_path: Option<String>,
    pub torrent_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedFile {
    pub path: String,
    pub resolution: String,
    pub codec: String,
    pub target_server_ids: Vec<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub episode_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodeContext {
    pub encoded_files: Vec<EncodedFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliverContext {
    pub delivered_servers: Vec<String>,
    pub failed_servers: Vec<String>,
    pub recovered_servers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApprovalContext {
    pub approval_id: Option<String>,
    pub approved: bool,
}

/// The full per-execution blackboard. Reserved sub-objects are typed;
/// anything a custom step type needs beyond them goes in `extra`, keeping
/// the open-map escape hatch the design notes call for (§9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingContext {
    pub search: SearchContext,
    pub download: DownloadContext,
    pub encode: EncodeContext,
    pub deliver: DeliverContext,
    pub approval: ApprovalContext,
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

impl ProcessingContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders the context as a JSON tree for the condition evaluator, which
    /// only ever reads — it never needs the typed accessors.
    pub fn as_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn to_blob(&self) -> Result<String, crate::error::PipelineError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_blob(blob: &str) -> Result<Self, crate::error::PipelineError> {
        Ok(serde_json::from_str(blob)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_blob() {
        let mut ctx = ProcessingContext::new();
        ctx.download.source_file_path = Some("/mnt/x.mkv".into());
        let blob = ctx.to_blob().unwrap();
        let restored = ProcessingContext::from_blob(&blob).unwrap();
        assert_eq!(restored.download.source_file_path.as_deref(), Some("/mnt/x.mkv"));
    }

    #[test]
    fn condition_evaluator_can_see_reserved_keys() {
        let mut ctx = ProcessingContext::new();
        ctx.search.available_releases.push(Release {
            title: "x".into(),
            resolution: crate::value_objects::release::Resolution::R1080p,
            codec: crate::value_objects::release::Codec::H264,
            seeders: 1,
            size_bytes: 1,
            publish_date: chrono::Utc::now(),
            download_url: "magnet:?xt=x".into(),
        });
        let json = ctx.as_json();
        assert_eq!(json["search"]["available_releases"].as_array().unwrap().len(), 1);
    }
}
