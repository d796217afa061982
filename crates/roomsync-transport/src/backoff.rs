// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded exponential backoff for reconnect scheduling.

use std::time::Duration;

use roomsync_config::model::ReconnectConfig;

/// Reconnect schedule: delays grow geometrically from `initial_delay` up to
/// `max_delay`, and at most `max_attempts` reconnects follow a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            initial_delay: config.initial_delay(),
            max_delay: config.max_delay(),
            multiplier: config.multiplier,
            max_attempts: config.max_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base = self.initial_delay.as_millis() as f64;
        let cap = self.max_delay.as_millis() as f64;
        let millis = (base * self.multiplier.powi(exponent)).min(cap);
        if millis.is_finite() {
            Duration::from_millis(millis as u64)
        } else {
            self.max_delay
        }
    }

    /// Whether `attempt` reconnects would exceed the bound.
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_attempts
    }
}
