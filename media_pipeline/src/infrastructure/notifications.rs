// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A minimal webhook notification sink (§1/§6's explicit non-goal — a
//! generic JSON POST demonstrates the seam; it is not a templated,
//! multi-channel notification service).

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use media_pipeline_domain::ports::NotificationSink;
use media_pipeline_domain::PipelineError;

pub struct WebhookNotificationSink {
    client: Client,
    webhook_url: String,
}

impl WebhookNotificationSink {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        let client = Client::builder().timeout(Duration::from_secs(10)).build().expect("reqwest client builder never fails for this config");
        Self { client, webhook_url: webhook_url.into() }
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    subject: &'a str,
    body: &'a str,
}

#[async_trait::async_trait]
impl NotificationSink for WebhookNotificationSink {
    async fn notify(&self, subject: &str, body: &str) -> Result<(), PipelineError> {
        debug!(subject, "sending notification");
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookPayload { subject, body })
            .send()
            .await
            .map_err(|e| PipelineError::internal(format!("notification webhook request failed: {e}")))?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "notification webhook returned non-success status");
        }
        Ok(())
    }
}
