// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A Newznab/Torznab-shaped indexer adapter (the dominant wire format among
//! self-hosted indexers). Only `search` is exposed past the port boundary;
//! everything else — auth, categories, RSS — is left for a real deployment
//! to configure via `base_url`/`api_key`.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use media_pipeline_domain::ports::{IndexerClient, IndexerRelease};
use media_pipeline_domain::value_objects::release::{Codec, Resolution};
use media_pipeline_domain::PipelineError;

pub struct HttpIndexerClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpIndexerClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder().timeout(Duration::from_secs(30)).build().expect("reqwest client builder never fails for this config");
        Self { client, base_url: base_url.into(), api_key: api_key.into() }
    }
}

#[derive(Debug, Deserialize)]
struct IndexerSearchResponse {
    #[serde(default)]
    results: Vec<IndexerSearchResult>,
}

#[derive(Debug, Deserialize)]
struct IndexerSearchResult {
    title: String,
    resolution: String,
    codec: String,
    seeders: u32,
    size_bytes: u64,
    publish_date: chrono::DateTime<chrono::Utc>,
    download_url: String,
}

fn parse_resolution(raw: &str) -> Resolution {
    match raw {
        "480p" => Resolution::R480p,
        "720p" => Resolution::R720p,
        "2160p" | "4k" => Resolution::R2160p,
        _ => Resolution::R1080p,
    }
}

fn parse_codec(raw: &str) -> Codec {
    match raw.to_ascii_lowercase().as_str() {
        "h264" | "x264" | "avc" => Codec::H264,
        "h265" | "x265" | "hevc" => Codec::Hevc,
        "av1" => Codec::Av1,
        _ => Codec::Other,
    }
}

#[async_trait::async_trait]
impl IndexerClient for HttpIndexerClient {
    async fn search(&self, title: &str, year: Option<u16>, season: Option<u32>) -> Result<Vec<IndexerRelease>, PipelineError> {
        debug!(title, ?year, ?season, "searching indexer");
        let mut query = self
            .client
            .get(format!("{}/api/v1/search", self.base_url))
            .query(&[("apikey", self.api_key.as_str()), ("q", title)]);
        if let Some(year) = year {
            query = query.query(&[("year", year)]);
        }
        if let Some(season) = season {
            query = query.query(&[("season", season)]);
        }

        let response = query.send().await.map_err(|e| PipelineError::internal(format!("indexer request failed: {e}")))?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "indexer returned non-success status");
            return Err(PipelineError::internal(format!("indexer responded with {}", response.status())));
        }

        let parsed: IndexerSearchResponse =
            response.json().await.map_err(|e| PipelineError::internal(format!("indexer response decode failed: {e}")))?;

        Ok(parsed
            .results
            .into_iter()
            .map(|r| IndexerRelease {
                title: r.title,
                resolution: parse_resolution(&r.resolution),
                codec: parse_codec(&r.codec),
                seeders: r.seeders,
                size_bytes: r.size_bytes,
                publish_date: r.publish_date,
                download_url: r.download_url,
            })
            .collect())
    }
}
