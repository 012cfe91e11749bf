// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A minimal `rsync`-over-SSH delivery transport (§4.6/§1's explicit
//! non-goal — this demonstrates the seam, not a full transfer engine with
//! resumability, bandwidth shaping, or parallel streams).

use std::collections::HashMap;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use media_pipeline_domain::ports::DeliveryTransport;
use media_pipeline_domain::value_objects::ids::ServerId;
use media_pipeline_domain::PipelineError;

/// One entry per delivery target: the SSH host `rsync` connects to, and a
/// remote filesystem prefix used only by `exists`'s `ssh test -e` probe (the
/// actual transfer destination path comes from the caller).
#[derive(Debug, Clone)]
pub struct RsyncTarget {
    pub ssh_host: String,
    pub remote_root: String,
}

pub struct RsyncDeliveryTransport {
    targets: HashMap<ServerId, RsyncTarget>,
}

impl RsyncDeliveryTransport {
    pub fn new(targets: HashMap<ServerId, RsyncTarget>) -> Self {
        Self { targets }
    }

    fn target(&self, server_id: ServerId) -> Result<&RsyncTarget, PipelineError> {
        self.targets.get(&server_id).ok_or_else(|| PipelineError::not_found(format!("delivery target {server_id}")))
    }
}

#[async_trait::async_trait]
impl DeliveryTransport for RsyncDeliveryTransport {
    async fn transfer(
        &self,
        server_id: ServerId,
        source_path: &str,
        destination_path: &str,
        on_progress: Box<dyn Fn(u8) + Send + Sync>,
    ) -> Result<(), PipelineError> {
        let target = self.target(server_id)?;
        let remote = format!("{}:{}", target.ssh_host, destination_path);
        debug!(source_path, remote, "starting rsync transfer");

        let mut child = Command::new("rsync")
            .args(["-az", "--info=progress2", source_path, &remote])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PipelineError::internal(format!("failed to spawn rsync: {e}")))?;

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(percent) = parse_rsync_progress(&line) {
                    on_progress(percent);
                }
            }
        }

        let status = child.wait().await.map_err(|e| PipelineError::internal(format!("rsync process error: {e}")))?;
        if !status.success() {
            warn!(?status, "rsync exited with failure");
            return Err(PipelineError::internal(format!("rsync exited with status {status}")));
        }
        on_progress(100);
        Ok(())
    }

    async fn exists(&self, server_id: ServerId, destination_path: &str) -> Result<bool, PipelineError> {
        let target = self.target(server_id)?;
        let status = Command::new("ssh")
            .args([&target.ssh_host, "test", "-e", destination_path])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| PipelineError::internal(format!("failed to spawn ssh: {e}")))?;
        Ok(status.success())
    }

    async fn request_library_scan(&self, server_id: ServerId) -> Result<(), PipelineError> {
        // Triggering a library rescan is media-server-specific (Plex/Jellyfin/
        // Emby each expose their own API) and out of scope for this seam; the
        // target is already known to exist, so a no-op is the honest default.
        let _ = self.target(server_id)?;
        Ok(())
    }
}

fn parse_rsync_progress(line: &str) -> Option<u8> {
    let percent_field = line.split_whitespace().find(|field| field.ends_with('%'))?;
    percent_field.trim_end_matches('%').parse::<u8>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_percent_from_progress2_line() {
        assert_eq!(parse_rsync_progress("  1,048,576  50%   10.00MB/s    0:00:01"), Some(50));
    }

    #[test]
    fn ignores_lines_without_a_percent_field() {
        assert_eq!(parse_rsync_progress("sending incremental file list"), None);
    }
}
