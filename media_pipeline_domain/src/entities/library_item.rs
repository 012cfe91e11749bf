// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # LibraryItem — a delivered file's record on one server (§4.6)
//!
//! Upserted `(tmdbId, kind, serverId) → {quality, addedAt, syncedAt}` after a
//! successful delivery; the natural-key tuple is the row's identity, there is
//! no separate surrogate id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::ids::ServerId;
use crate::value_objects::media_kind::MediaKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryItem {
    pub tmdb_id: String,
    pub kind: MediaKind,
    pub server_id: ServerId,
    pub quality: String,
    pub added_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
}

impl LibraryItem {
    pub fn upsert(tmdb_id: impl Into<String>, kind: MediaKind, server_id: ServerId, quality: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { tmdb_id: tmdb_id.into(), kind, server_id, quality: quality.into(), added_at: now, synced_at: now }
    }

    pub fn resync(&mut self, quality: impl Into<String>) {
        self.quality = quality.into();
        self.synced_at = Utc::now();
    }
}
