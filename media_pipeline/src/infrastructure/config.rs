// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Layered application configuration: built-in defaults, then `config.toml`,
//! then `MEDIAPIPE_`-prefixed environment variables, via the `config` crate.

use std::collections::HashMap;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use media_pipeline_domain::entities::BreakerConfig;
use media_pipeline_domain::value_objects::ids::ServerId;
use media_pipeline_domain::value_objects::release::{Codec, Resolution};
use media_pipeline_domain::PipelineError;

/// One encode profile, serialized verbatim into `job:assign`'s `profile`
/// field (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodeProfile {
    pub id: String,
    pub name: String,
    pub video_encoder: String,
    pub video_quality: String,
    pub video_max_resolution: Option<String>,
    pub video_max_bitrate: Option<u64>,
    pub hw_accel: Option<String>,
    pub hw_device: Option<String>,
    pub video_flags: Vec<String>,
    pub audio_encoder: String,
    pub audio_flags: Vec<String>,
    pub subtitles_mode: String,
    pub container: String,
}

/// `serverPrefix -> remotePrefix`, kept in longest-server-prefix-first order
/// (§4.5's "ordered prefix map, most specific first").
#[derive(Debug, Clone, Deserialize)]
pub struct PathTranslationEntry {
    pub server_prefix: String,
    pub remote_prefix: String,
}

/// One configured `rsync` delivery destination. `server_id` is the `Ulid`
/// a `Request::target_server_ids` entry refers to — operators mint it once
/// (e.g. `ulid` CLI) and keep it stable across this table, the database,
/// and whatever else names that server.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryTargetEntry {
    pub server_id: ServerId,
    pub ssh_host: String,
    pub remote_root: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default = "default_true")]
    pub require_all_servers_success: bool,
    #[serde(default)]
    pub targets: Vec<DeliveryTargetEntry>,
}

fn default_true() -> bool {
    true
}

impl DeliveryConfig {
    /// The `ServerId -> RsyncTarget` table `main.rs` hands to
    /// `RsyncDeliveryTransport::new`.
    pub fn rsync_targets(&self) -> HashMap<ServerId, crate::infrastructure::delivery::RsyncTarget> {
        self.targets
            .iter()
            .map(|t| (t.server_id, crate::infrastructure::delivery::RsyncTarget { ssh_host: t.ssh_host.clone(), remote_root: t.remote_root.clone() }))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    pub bind_address: String,
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
    #[serde(default = "default_heartbeat_check_interval_secs")]
    pub heartbeat_check_interval_secs: u64,
    #[serde(default = "default_job_stall_timeout_secs")]
    pub job_stall_timeout_secs: u64,
    #[serde(default)]
    pub path_translation: Vec<PathTranslationEntry>,
    #[serde(default)]
    pub profiles: Vec<EncodeProfile>,
}

fn default_heartbeat_timeout_secs() -> u64 {
    90
}

fn default_heartbeat_check_interval_secs() -> u64 {
    30
}

fn default_job_stall_timeout_secs() -> u64 {
    120
}

impl DispatchConfig {
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn heartbeat_check_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_check_interval_secs)
    }

    pub fn job_stall_timeout(&self) -> Duration {
        Duration::from_secs(self.job_stall_timeout_secs)
    }

    /// The ordered `(serverPrefix, remotePrefix)` table, sorted
    /// longest-`serverPrefix`-first per §4.5/§6.
    pub fn path_translation_table(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self.path_translation.iter().map(|e| (e.server_prefix.clone(), e.remote_prefix.clone())).collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        entries
    }

    pub fn profile_catalog(&self) -> HashMap<String, EncodeProfile> {
        self.profiles.iter().cloned().map(|p| (p.id.clone(), p)).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreakerThresholds {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_half_open_after_secs")]
    pub half_open_after_secs: i64,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_half_open_after_secs() -> i64 {
    300
}

fn default_success_threshold() -> u32 {
    2
}

impl From<BreakerThresholds> for BreakerConfig {
    fn from(t: BreakerThresholds) -> Self {
        BreakerConfig {
            failure_threshold: t.failure_threshold,
            half_open_after: chrono::Duration::seconds(t.half_open_after_secs),
            success_threshold: t.success_threshold,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default = "default_recovery_interval_secs")]
    pub download_recovery_interval_secs: u64,
    #[serde(default = "default_recovery_interval_secs")]
    pub encoder_monitor_interval_secs: u64,
    #[serde(default = "default_recovery_interval_secs")]
    pub stuck_item_recovery_interval_secs: u64,
    #[serde(default = "default_retry_backoff_interval_secs")]
    pub retry_backoff_interval_secs: u64,
}

fn default_recovery_interval_secs() -> u64 {
    60
}

fn default_retry_backoff_interval_secs() -> u64 {
    1
}

impl RecoveryConfig {
    pub fn download_recovery_interval(&self) -> Duration {
        Duration::from_secs(self.download_recovery_interval_secs)
    }

    pub fn encoder_monitor_interval(&self) -> Duration {
        Duration::from_secs(self.encoder_monitor_interval_secs)
    }

    pub fn stuck_item_recovery_interval(&self) -> Duration {
        Duration::from_secs(self.stuck_item_recovery_interval_secs)
    }

    pub fn retry_backoff_interval(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_interval_secs)
    }
}

/// Where delivered files land, and the quality/retry defaults a `Request`
/// carries when it specifies none of its own (§3, §4.2, §4.6).
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    pub movies_root: String,
    pub tv_root: String,
    #[serde(default = "default_min_resolution")]
    pub default_min_resolution: Resolution,
    #[serde(default)]
    pub default_max_resolution: Option<Resolution>,
    #[serde(default)]
    pub default_preferred_codec: Option<Codec>,
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,
    #[serde(default = "default_tv_continuation_delay_secs")]
    pub tv_continuation_delay_secs: u64,
}

fn default_min_resolution() -> Resolution {
    Resolution::R720p
}

fn default_max_attempts() -> u32 {
    3
}

fn default_tv_continuation_delay_secs() -> u64 {
    30
}

impl EngineSettings {
    pub fn default_quality_target(&self) -> media_pipeline_domain::value_objects::release::QualityTarget {
        media_pipeline_domain::value_objects::release::QualityTarget {
            min_resolution: self.default_min_resolution,
            max_resolution: self.default_max_resolution,
            preferred_codec: self.default_preferred_codec,
        }
    }

    pub fn naming(&self) -> crate::application::naming::NamingConfig {
        crate::application::naming::NamingConfig { movies_root: self.movies_root.clone(), tv_root: self.tv_root.clone() }
    }

    pub fn tv_continuation_delay(&self) -> Duration {
        Duration::from_secs(self.tv_continuation_delay_secs)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            movies_root: "/media/movies".into(),
            tv_root: "/media/tv".into(),
            default_min_resolution: default_min_resolution(),
            default_max_resolution: None,
            default_preferred_codec: None,
            default_max_attempts: default_max_attempts(),
            tv_continuation_delay_secs: default_tv_continuation_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub breaker: BreakerThresholds,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub indexer_base_url: String,
    #[serde(default)]
    pub indexer_api_key: String,
    #[serde(default)]
    pub torrent_client_base_url: String,
    #[serde(default)]
    pub notification_webhook_url: String,
    #[serde(default = "default_metrics_bind_address")]
    pub metrics_bind_address: String,
}

fn default_metrics_bind_address() -> String {
    "0.0.0.0:9090".to_string()
}

impl Default for BreakerThresholds {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            half_open_after_secs: default_half_open_after_secs(),
            success_threshold: default_success_threshold(),
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            download_recovery_interval_secs: default_recovery_interval_secs(),
            encoder_monitor_interval_secs: default_recovery_interval_secs(),
            stuck_item_recovery_interval_secs: default_recovery_interval_secs(),
            retry_backoff_interval_secs: default_retry_backoff_interval_secs(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self { require_all_servers_success: true, targets: Vec::new() }
    }
}

const DEFAULTS_TOML: &str = r#"
database_url = "sqlite://media_pipeline.db"
indexer_base_url = ""
indexer_api_key = ""
torrent_client_base_url = ""
notification_webhook_url = ""

[dispatch]
bind_address = "0.0.0.0:7337"

[[dispatch.profiles]]
id = "default"
name = "Default (H.264, CRF 20)"
video_encoder = "libx264"
video_quality = "crf:20"
audio_encoder = "aac"
subtitles_mode = "copy"
container = "mkv"
video_flags = []
audio_flags = []
"#;

impl AppConfig {
    /// Loads defaults, then an optional `config.toml` in `config_dir`
    /// (silently absent is fine), then `MEDIAPIPE_`-prefixed env vars —
    /// nested keys separated by `__` (`MEDIAPIPE_DISPATCH__BIND_ADDRESS`).
    pub fn load(config_path: Option<&str>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder().add_source(File::from_str(DEFAULTS_TOML, FileFormat::Toml));
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        builder = builder.add_source(Environment::with_prefix("MEDIAPIPE").separator("__"));
        let config = builder.build().map_err(|e| PipelineError::ConfigError(format!("failed to build configuration: {e}")))?;
        config.try_deserialize().map_err(|e| PipelineError::ConfigError(format!("failed to parse configuration: {e}")))
    }

    /// The ordered `(serverPrefix, remotePrefix)` table, sorted
    /// longest-`serverPrefix`-first per §4.5/§6.
    pub fn path_translation_table(&self) -> Vec<(String, String)> {
        self.dispatch.path_translation_table()
    }

    pub fn profile_catalog(&self) -> HashMap<String, EncodeProfile> {
        self.dispatch.profile_catalog()
    }

    /// Assembles `application_root::EngineConfig` from every layer this
    /// type carries, plus the one piece of CLI-only state (`channel_depth`)
    /// it doesn't itself know about.
    pub fn engine_config(&self, channel_depth: usize) -> crate::application::application_root::EngineConfig {
        crate::application::application_root::EngineConfig {
            default_quality_target: self.engine.default_quality_target(),
            naming: self.engine.naming(),
            default_max_attempts: self.engine.default_max_attempts,
            channel_depth,
            tv_continuation_delay: self.engine.tv_continuation_delay(),
            download_recovery_interval: self.recovery.download_recovery_interval(),
            encoder_monitor_interval: self.recovery.encoder_monitor_interval(),
            stuck_item_recovery_interval: self.recovery.stuck_item_recovery_interval(),
            retry_backoff_interval: self.recovery.retry_backoff_interval(),
            breaker: self.breaker.clone().into(),
        }
    }
}
