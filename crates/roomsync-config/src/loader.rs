// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./roomsync.toml` > `~/.config/roomsync/roomsync.toml` > `/etc/roomsync/roomsync.toml`
//! with environment variable overrides via `ROOMSYNC_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RoomsyncConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/roomsync/roomsync.toml` (system-wide)
/// 3. `~/.config/roomsync/roomsync.toml` (user XDG config)
/// 4. `./roomsync.toml` (local directory)
/// 5. `ROOMSYNC_*` environment variables
pub fn load_config() -> Result<RoomsyncConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<RoomsyncConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RoomsyncConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RoomsyncConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RoomsyncConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(RoomsyncConfig::default()))
        .merge(Toml::file("/etc/roomsync/roomsync.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("roomsync/roomsync.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("roomsync.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `ROOMSYNC_RECONNECT_MAX_ATTEMPTS` must map to
/// `reconnect.max_attempts`, not `reconnect.max.attempts`.
fn env_provider() -> Env {
    Env::prefixed("ROOMSYNC_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a prefix-stripped env key to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 5] = ["client", "server", "reconnect", "history", "delivery"];
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key
}
