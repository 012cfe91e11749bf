// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Request — a user's intent (§3)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::ids::{RequestId, ServerId};
use crate::value_objects::media_kind::MediaKind;
use crate::value_objects::release::Release;
use crate::value_objects::request_status::RequestStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub kind: MediaKind,
    pub external_id: String,
    pub title: String,
    pub year: u16,
    pub requested_seasons: Vec<u32>,
    pub requested_episodes: Vec<(u32, u32)>,
    pub targets: Vec<ServerId>,
    pub status: RequestStatus,
    pub progress: u8,
    pub current_step: Option<String>,
    pub error: Option<String>,
    pub available_releases: Vec<Release>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn new_movie(external_id: impl Into<String>, title: impl Into<String>, year: u16, targets: Vec<ServerId>) -> Self {
        let now = Utc::now();
        Self {
            id: RequestId::new(),
            kind: MediaKind::Movie,
            external_id: external_id.into(),
            title: title.into(),
            year,
            requested_seasons: Vec::new(),
            requested_episodes: Vec::new(),
            targets,
            status: RequestStatus::Pending,
            progress: 0,
            current_step: None,
            error: None,
            available_releases: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn new_tv(
        external_id: impl Into<String>,
        title: impl Into<String>,
        year: u16,
        requested_episodes: Vec<(u32, u32)>,
        targets: Vec<ServerId>,
    ) -> Self {
        let mut req = Self::new_movie(external_id, title, year, targets);
        req.kind = MediaKind::Tv;
        req.requested_seasons = requested_episodes.iter().map(|(s, _)| *s).collect::<std::collections::BTreeSet<_>>().into_iter().collect();
        req.requested_episodes = requested_episodes;
        req
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
        self.touch();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.set_status(RequestStatus::Failed);
    }

    /// Invariant 6: a TV request's coarse status is a monotone function of
    /// its items' statuses, entering `completed` only when every item is
    /// `completed | skipped`.
    pub fn tv_completion_status(item_statuses: &[crate::value_objects::processing_status::ProcessingStatus]) -> RequestStatus {
        use crate::value_objects::processing_status::ProcessingStatus::*;
        if item_statuses.iter().any(|s| matches!(s, Failed)) && item_statuses.iter().all(|s| s.is_terminal()) {
            return RequestStatus::Failed;
        }
        if item_statuses.iter().all(|s| s.is_terminal_positive()) {
            RequestStatus::Completed
        } else {
            RequestStatus::Processing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::processing_status::ProcessingStatus::*;

    #[test]
    fn tv_request_completes_only_when_every_item_is_terminal_positive() {
        let statuses = vec![Completed, Skipped, Completed];
        assert_eq!(Request::tv_completion_status(&statuses), RequestStatus::Completed);

        let statuses = vec![Completed, Downloading];
        assert_eq!(Request::tv_completion_status(&statuses), RequestStatus::Processing);
    }
}
