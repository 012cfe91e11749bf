// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Circuit Breaker Service (C8, §4.9)
//!
//! A thin service wrapper around `CircuitBreaker` (pure domain logic,
//! already implemented) and `CircuitBreakerRepository` + `Clock`: it loads
//! or creates the named breaker, performs the state check/record, and
//! persists the result. Every external collaborator call in this crate goes
//! through `guard` so a tripped breaker fails fast with `ExternalUnavailable`
//! instead of letting a hung indexer/torrent/transport call block a step.

use std::future::Future;
use std::sync::Arc;

use media_pipeline_domain::entities::circuit_breaker::BreakerConfig;
use media_pipeline_domain::ports::{CircuitBreakerRepository, Clock};
use media_pipeline_domain::PipelineError;

pub struct CircuitBreakerService {
    repository: Arc<dyn CircuitBreakerRepository>,
    clock: Arc<dyn Clock>,
    config: BreakerConfig,
}

impl CircuitBreakerService {
    pub fn new(repository: Arc<dyn CircuitBreakerRepository>, clock: Arc<dyn Clock>, config: BreakerConfig) -> Self {
        Self { repository, clock, config }
    }

    /// Runs `call` only if `service`'s breaker currently permits it;
    /// records the outcome and persists the breaker either way.
    pub async fn guard<T, F, Fut>(&self, service: &str, call: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut breaker = self.repository.get_or_create(service).await?;
        breaker.config = self.config;
        let now = self.clock.now();

        if !breaker.is_available(now) {
            self.repository.save(&breaker).await?;
            return Err(PipelineError::ExternalUnavailable(service.to_string()));
        }

        match call().await {
            Ok(value) => {
                breaker.record_success(now);
                self.repository.save(&breaker).await?;
                Ok(value)
            }
            Err(err) => {
                breaker.record_failure(now);
                self.repository.save(&breaker).await?;
                Err(err)
            }
        }
    }
}
