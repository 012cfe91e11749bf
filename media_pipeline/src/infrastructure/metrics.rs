// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Prometheus metrics for the engine: active executions, queue depth,
//! encoder utilization, and per-service circuit breaker state (§5's
//! "periodic metrics" task, carried as ambient observability).

use std::sync::Arc;

use prometheus::{GaugeVec, IntGauge, IntGaugeVec, Opts, Registry};

use media_pipeline_domain::PipelineError;

#[derive(Clone)]
pub struct MetricsService {
    registry: Arc<Registry>,
    active_executions: IntGauge,
    queue_depth: IntGauge,
    encoder_utilization: GaugeVec,
    circuit_breaker_state: IntGaugeVec,
}

impl MetricsService {
    pub fn new() -> Result<Self, PipelineError> {
        let registry = Registry::new();

        let active_executions =
            IntGauge::with_opts(Opts::new("active_executions", "In-flight pipeline executions").namespace("media_pipeline"))
                .map_err(|e| PipelineError::internal(format!("failed to create active_executions metric: {e}")))?;

        let queue_depth = IntGauge::with_opts(Opts::new("queue_depth", "Pending encoder assignments").namespace("media_pipeline"))
            .map_err(|e| PipelineError::internal(format!("failed to create queue_depth metric: {e}")))?;

        let encoder_utilization = GaugeVec::new(
            Opts::new("encoder_utilization_ratio", "currentJobs / maxConcurrent per encoder").namespace("media_pipeline"),
            &["encoder_id"],
        )
        .map_err(|e| PipelineError::internal(format!("failed to create encoder_utilization_ratio metric: {e}")))?;

        let circuit_breaker_state = IntGaugeVec::new(
            Opts::new("circuit_breaker_state", "0=closed, 1=half_open, 2=open, per service").namespace("media_pipeline"),
            &["service"],
        )
        .map_err(|e| PipelineError::internal(format!("failed to create circuit_breaker_state metric: {e}")))?;

        registry
            .register(Box::new(active_executions.clone()))
            .map_err(|e| PipelineError::internal(format!("failed to register active_executions metric: {e}")))?;
        registry
            .register(Box::new(queue_depth.clone()))
            .map_err(|e| PipelineError::internal(format!("failed to register queue_depth metric: {e}")))?;
        registry
            .register(Box::new(encoder_utilization.clone()))
            .map_err(|e| PipelineError::internal(format!("failed to register encoder_utilization_ratio metric: {e}")))?;
        registry
            .register(Box::new(circuit_breaker_state.clone()))
            .map_err(|e| PipelineError::internal(format!("failed to register circuit_breaker_state metric: {e}")))?;

        Ok(Self { registry: Arc::new(registry), active_executions, queue_depth, encoder_utilization, circuit_breaker_state })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn set_active_executions(&self, count: i64) {
        self.active_executions.set(count);
    }

    pub fn set_queue_depth(&self, count: i64) {
        self.queue_depth.set(count);
    }

    pub fn set_encoder_utilization(&self, encoder_id: &str, current_jobs: u32, max_concurrent: u32) {
        let ratio = if max_concurrent == 0 { 0.0 } else { current_jobs as f64 / max_concurrent as f64 };
        self.encoder_utilization.with_label_values(&[encoder_id]).set(ratio);
    }

    pub fn set_circuit_breaker_state(&self, service: &str, state_ordinal: i64) {
        self.circuit_breaker_state.with_label_values(&[service]).set(state_ordinal);
    }

    pub fn encode(&self) -> Result<String, PipelineError> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| PipelineError::internal(format!("failed to encode metrics: {e}")))?;
        String::from_utf8(buffer).map_err(|e| PipelineError::internal(format!("metrics output was not valid utf-8: {e}")))
    }
}
