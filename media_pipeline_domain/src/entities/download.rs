// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Download — the torrent-side bookkeeping row (§3)
//!
//! Treated as a collaborator in spec.md's scoping (the torrent client itself
//! is out of scope, §1), but the row it leaves behind is in-scope: the
//! download step keys it by torrent hash for idempotent re-adds (§4.4), and
//! `DownloadRecoveryWorker` (§4.8) matches against it by parsed name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::ids::{DownloadId, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    Queued,
    Downloading,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: DownloadId,
    pub request_id: RequestId,
    /// Infohash of the torrent; the natural idempotency key for re-adds
    /// (§4.4: "Creates a `Download` row keyed by the torrent hash").
    pub torrent_hash: String,
    pub parsed_title: String,
    pub parsed_year: Option<u16>,
    pub parsed_season: Option<u32>,
    pub state: DownloadState,
    pub percent_complete: u8,
    pub content_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Download {
    pub fn new(request_id: RequestId, torrent_hash: impl Into<String>, parsed_title: impl Into<String>, parsed_year: Option<u16>, parsed_season: Option<u32>) -> Self {
        let now = Utc::now();
        Self {
            id: DownloadId::new(),
            request_id,
            torrent_hash: torrent_hash.into(),
            parsed_title: parsed_title.into(),
            parsed_year,
            parsed_season,
            state: DownloadState::Queued,
            percent_complete: 0,
            content_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state == DownloadState::Completed && self.percent_complete >= 100
    }

    /// Normalised-name equality the recovery worker uses to match a
    /// `ProcessingItem` back to its torrent (§4.8): title case-folded, year
    /// matching for movies, season matching for TV.
    pub fn matches_parsed_name(&self, title: &str, year: Option<u16>, season: Option<u32>) -> bool {
        let normalise = |s: &str| s.to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect::<String>();
        if normalise(&self.parsed_title) != normalise(title) {
            return false;
        }
        if let (Some(a), Some(b)) = (self.parsed_year, year) {
            if a != b {
                return false;
            }
        }
        if let (Some(a), Some(b)) = (self.parsed_season, season) {
            if a != b {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ignoring_case_and_punctuation() {
        let d = Download::new(RequestId::new(), "abc123", "The Matrix", Some(1999), None);
        assert!(d.matches_parsed_name("the matrix", Some(1999), None));
        assert!(!d.matches_parsed_name("the matrix", Some(2003), None));
    }

    #[test]
    fn completion_requires_full_percent() {
        let mut d = Download::new(RequestId::new(), "abc123", "x", None, None);
        d.state = DownloadState::Completed;
        d.percent_complete = 99;
        assert!(!d.is_complete());
        d.percent_complete = 100;
        assert!(d.is_complete());
    }
}
