// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes and the internal consistency of the backoff policy.

use crate::diagnostic::ConfigError;
use crate::model::RoomsyncConfig;

const MAX_PAGE_SIZE: u32 = 500;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &RoomsyncConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    check_url(&config.server.ws_url, "server.ws_url", &["ws", "wss"], &mut fail);
    check_url(&config.server.api_url, "server.api_url", &["http", "https"], &mut fail);

    if let Some(token) = &config.server.token
        && token.trim().is_empty()
    {
        fail("server.token must not be blank; omit it to disable the channel".to_string());
    }

    let reconnect = &config.reconnect;
    if reconnect.initial_delay_ms == 0 {
        fail("reconnect.initial_delay_ms must be greater than 0".to_string());
    }
    if reconnect.max_delay_ms < reconnect.initial_delay_ms {
        fail(format!(
            "reconnect.max_delay_ms ({}) must be at least reconnect.initial_delay_ms ({})",
            reconnect.max_delay_ms, reconnect.initial_delay_ms
        ));
    }
    if !reconnect.multiplier.is_finite() || reconnect.multiplier < 1.0 {
        fail(format!(
            "reconnect.multiplier must be at least 1.0, got {}",
            reconnect.multiplier
        ));
    }
    if reconnect.connect_timeout_secs == 0 {
        fail("reconnect.connect_timeout_secs must be greater than 0".to_string());
    }
    if reconnect.stale_after_secs == Some(0) {
        fail("reconnect.stale_after_secs must be greater than 0 when set".to_string());
    }

    let history = &config.history;
    if history.page_size == 0 || history.page_size > MAX_PAGE_SIZE {
        fail(format!(
            "history.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
            history.page_size
        ));
    }
    if history.max_pages == 0 {
        fail("history.max_pages must be at least 1".to_string());
    }
    if history.timeout_secs == 0 {
        fail("history.timeout_secs must be greater than 0".to_string());
    }

    if config.delivery.ack_timeout_secs == 0 {
        fail("delivery.ack_timeout_secs must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(value: &str, key: &str, schemes: &[&str], fail: &mut impl FnMut(String)) {
    let value = value.trim();
    if value.is_empty() {
        fail(format!("{key} must not be empty"));
        return;
    }
    let scheme_ok = value
        .split_once("://")
        .is_some_and(|(scheme, rest)| schemes.contains(&scheme) && !rest.is_empty());
    if !scheme_ok {
        fail(format!(
            "{key} `{value}` must start with {}",
            schemes
                .iter()
                .map(|s| format!("{s}://"))
                .collect::<Vec<_>>()
                .join(" or ")
        ));
    }
}
