// /////////////////////////////////////////////////////////////////////////////
// Media Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Circuit Breaker (C8, §4.9)
//!
//! Per external-service CLOSED/OPEN/HALF_OPEN with failure count + cooldown,
//! persisted one row per service.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub half_open_after: Duration,
    pub success_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 3, half_open_after: Duration::minutes(5), success_threshold: 2 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreaker {
    pub service: String,
    pub state: BreakerState,
    pub failures: u32,
    pub successes_in_half_open: u32,
    pub last_failure: Option<DateTime<Utc>>,
    pub opens_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub config: BreakerConfig,
}

impl CircuitBreaker {
    pub fn new(service: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            service: service.into(),
            state: BreakerState::Closed,
            failures: 0,
            successes_in_half_open: 0,
            last_failure: None,
            opens_at: None,
            config,
        }
    }

    /// True when CLOSED, true when HALF_OPEN, true when OPEN and
    /// `now >= opens_at` (which also transitions the breaker to HALF_OPEN as
    /// a side effect), false otherwise.
    pub fn is_available(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open => {
                if self.opens_at.map(|t| now >= t).unwrap_or(false) {
                    self.state = BreakerState::HalfOpen;
                    self.successes_in_half_open = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&mut self, now: DateTime<Utc>) {
        match self.state {
            BreakerState::Closed => {
                self.failures = 0;
            }
            BreakerState::HalfOpen => {
                self.successes_in_half_open += 1;
                if self.successes_in_half_open >= self.config.success_threshold {
                    self.state = BreakerState::Closed;
                    self.failures = 0;
                    self.successes_in_half_open = 0;
                    self.opens_at = None;
                }
            }
            BreakerState::Open => {
                // A success while open should not happen (calls fail fast),
                // but if it does, treat it like reaching half-open early.
                let _ = now;
            }
        }
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.last_failure = Some(now);
        match self.state {
            BreakerState::HalfOpen => {
                self.open(now);
            }
            BreakerState::Closed => {
                self.failures += 1;
                if self.failures >= self.config.failure_threshold {
                    self.open(now);
                }
            }
            BreakerState::Open => {}
        }
    }

    fn open(&mut self, now: DateTime<Utc>) {
        self.state = BreakerState::Open;
        self.opens_at = Some(now + self.config.half_open_after);
        self.successes_in_half_open = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_failure_threshold() {
        let mut cb = CircuitBreaker::new("indexer", BreakerConfig { failure_threshold: 2, ..Default::default() });
        let t0 = Utc::now();
        cb.record_failure(t0);
        assert_eq!(cb.state, BreakerState::Closed);
        cb.record_failure(t0);
        assert_eq!(cb.state, BreakerState::Open);
        assert!(!cb.is_available(t0));
    }

    #[test]
    fn transitions_to_half_open_after_cooldown_then_closes_after_successes() {
        let cfg = BreakerConfig { failure_threshold: 1, half_open_after: Duration::minutes(5), success_threshold: 2 };
        let mut cb = CircuitBreaker::new("torrent", cfg);
        let t0 = Utc::now();
        cb.record_failure(t0);
        assert!(!cb.is_available(t0));
        let t1 = t0 + Duration::minutes(6);
        assert!(cb.is_available(t1));
        assert_eq!(cb.state, BreakerState::HalfOpen);
        cb.record_success(t1);
        assert_eq!(cb.state, BreakerState::HalfOpen);
        cb.record_success(t1);
        assert_eq!(cb.state, BreakerState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let cfg = BreakerConfig { failure_threshold: 1, half_open_after: Duration::minutes(5), success_threshold: 2 };
        let mut cb = CircuitBreaker::new("sftp", cfg);
        let t0 = Utc::now();
        cb.record_failure(t0);
        let t1 = t0 + Duration::minutes(6);
        cb.is_available(t1);
        cb.record_failure(t1);
        assert_eq!(cb.state, BreakerState::Open);
    }
}
