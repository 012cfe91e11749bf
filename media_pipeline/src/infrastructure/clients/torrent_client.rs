// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A qBittorrent Web API-shaped adapter — one of the more commonly
//! self-hosted clients, so its JSON shape is a reasonable minimal seam.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use media_pipeline_domain::ports::{ExistingTorrent, TorrentClient};
use media_pipeline_domain::PipelineError;

pub struct HttpTorrentClient {
    client: Client,
    base_url: String,
}

impl HttpTorrentClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder().timeout(Duration::from_secs(30)).build().expect("reqwest client builder never fails for this config");
        Self { client, base_url: base_url.into() }
    }
}

#[derive(Debug, Deserialize)]
struct TorrentInfo {
    hash: String,
    progress: f64,
    content_path: Option<String>,
}

impl HttpTorrentClient {
    async fn lookup(&self, torrent_hash: &str) -> Result<Option<TorrentInfo>, PipelineError> {
        let response = self
            .client
            .get(format!("{}/api/v2/torrents/info", self.base_url))
            .query(&[("hashes", torrent_hash)])
            .send()
            .await
            .map_err(|e| PipelineError::internal(format!("torrent client request failed: {e}")))?;
        let torrents: Vec<TorrentInfo> =
            response.json().await.map_err(|e| PipelineError::internal(format!("torrent client response decode failed: {e}")))?;
        Ok(torrents.into_iter().next())
    }
}

#[async_trait::async_trait]
impl TorrentClient for HttpTorrentClient {
    async fn find_existing(&self, _title: &str, _year: Option<u16>, _season: Option<u32>) -> Result<Option<ExistingTorrent>, PipelineError> {
        // The torrent daemon has no notion of parsed title/year/season; matching
        // against its listing is the caller's job once it has a candidate hash.
        // A minimal adapter has nothing to offer here beyond `None`.
        Ok(None)
    }

    async fn add(&self, download_url: &str, torrent_hash: &str) -> Result<(), PipelineError> {
        debug!(torrent_hash, "adding torrent to client");
        self.client
            .post(format!("{}/api/v2/torrents/add", self.base_url))
            .form(&[("urls", download_url)])
            .send()
            .await
            .map_err(|e| PipelineError::internal(format!("torrent add failed: {e}")))?;
        Ok(())
    }

    async fn progress(&self, torrent_hash: &str) -> Result<Option<u8>, PipelineError> {
        Ok(self.lookup(torrent_hash).await?.map(|t| (t.progress * 100.0).round() as u8))
    }

    async fn content_path(&self, torrent_hash: &str) -> Result<Option<String>, PipelineError> {
        Ok(self.lookup(torrent_hash).await?.and_then(|t| t.content_path))
    }
}
