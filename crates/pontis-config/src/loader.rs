// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./pontis.toml` > `~/.config/pontis/pontis.toml`
//! > `/etc/pontis/pontis.toml` with environment variable overrides via the
//! `PONTIS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::PontisConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/pontis/pontis.toml` (system-wide)
/// 3. `~/.config/pontis/pontis.toml` (user XDG config)
/// 4. `./pontis.toml` (local directory)
/// 5. `PONTIS_*` environment variables
pub fn load_config() -> Result<PontisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PontisConfig::default()))
        .merge(Toml::file("/etc/pontis/pontis.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("pontis/pontis.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("pontis.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from TOML content only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<PontisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PontisConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<PontisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(PontisConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `PONTIS_WEBHOOK_APP_SECRET` must map to
/// `webhook.app_secret`, not `webhook.app.secret`.
fn env_provider() -> Env {
    Env::prefixed("PONTIS_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: PONTIS_WEBHOOK_APP_SECRET -> "webhook_app_secret"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("bridge_", "bridge.", 1)
            .replacen("server_", "server.", 1)
            .replacen("webhook_", "webhook.", 1)
            .replacen("runtime_", "runtime.", 1)
            .replacen("graph_", "graph.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("queue_", "queue.", 1)
            .replacen("session_", "session.", 1)
            .replacen("refresh_", "refresh.", 1);
        mapped.into()
    })
}
