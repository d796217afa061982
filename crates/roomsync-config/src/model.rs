// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for roomsync.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level roomsync configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoomsyncConfig {
    /// Client identity and logging.
    #[serde(default)]
    pub client: ClientConfig,

    /// Live channel and history endpoints.
    #[serde(default)]
    pub server: ServerConfig,

    /// Reconnection policy for the live channel.
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// History fetch settings.
    #[serde(default)]
    pub history: HistoryConfig,

    /// Outbound delivery settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Client identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Name shown for the local user in the CLI.
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            display_name: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Live channel and history endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// WebSocket base URL; the conversation id is appended as a path segment.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// REST base URL for history fetches.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token. `None` means no channel is opened.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            api_url: default_api_url(),
            token: None,
        }
    }
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:8080/ws".to_string()
}

fn default_api_url() -> String {
    "http://127.0.0.1:8080/api".to_string()
}

/// Reconnection policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound on any single backoff delay.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Reconnect attempts after the initial connect before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Bound on a single connection establishment.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Treat the connection as dropped after this long without inbound frames.
    /// Unset disables staleness detection.
    #[serde(default)]
    pub stale_after_secs: Option<u64>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            max_attempts: default_max_attempts(),
            connect_timeout_secs: default_connect_timeout_secs(),
            stale_after_secs: None,
        }
    }
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after_secs.map(Duration::from_secs)
    }
}

fn default_initial_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_attempts() -> u32 {
    8
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// History fetch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    /// Messages requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Maximum number of pages followed per fetch.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Per-request timeout.
    #[serde(default = "default_history_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            timeout_secs: default_history_timeout_secs(),
        }
    }
}

fn default_page_size() -> u32 {
    50
}

fn default_max_pages() -> u32 {
    20
}

fn default_history_timeout_secs() -> u64 {
    15
}

/// How outbound submissions are confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckMode {
    /// Transport acceptance is treated as delivery.
    #[default]
    None,
    /// Wait for the server to echo the correlation token.
    Echo,
}

/// Outbound delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub ack_mode: AckMode,

    /// Time allowed for an echo before a submission is marked failed.
    #[serde(default = "default_ack_timeout_secs")]
    pub ack_timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            ack_mode: AckMode::default(),
            ack_timeout_secs: default_ack_timeout_secs(),
        }
    }
}

fn default_ack_timeout_secs() -> u64 {
    30
}
