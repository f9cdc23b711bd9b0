// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Pontis bridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Pontis configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values;
/// secrets (webhook app secret, runtime API key) are enforced at serve time,
/// not at parse time.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PontisConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub bridge: BridgeConfig,

    /// HTTP server binding and public URL.
    #[serde(default)]
    pub server: ServerConfig,

    /// Webhook signature verification.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Conversational-AI runtime endpoint.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Provider graph API (outbound sends + token exchange).
    #[serde(default)]
    pub graph: GraphConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ingestion queue tuning.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Session TTL and history bounds.
    #[serde(default)]
    pub session: SessionConfig,

    /// Credential refresh loop.
    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Display name of the bridge instance.
    #[serde(default = "default_bridge_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: default_bridge_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_bridge_name() -> String {
    "pontis".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used for data-deletion status links.
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

/// Webhook signature verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Provider app secret used for X-Hub HMAC verification and
    /// signed-request parsing. Required when `verify_signatures` is on.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Verify inbound signatures. Disabling this logs a warning on every
    /// unverified request; it exists for local development only.
    #[serde(default = "default_verify_signatures")]
    pub verify_signatures: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            app_secret: None,
            verify_signatures: default_verify_signatures(),
        }
    }
}

fn default_verify_signatures() -> bool {
    true
}

/// Conversational-AI runtime configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Base URL of the runtime, e.g. `https://runtime.example.com`.
    #[serde(default = "default_runtime_base_url")]
    pub base_url: String,

    /// Global default API key; per-tenant bindings may override it.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_runtime_timeout")]
    pub timeout_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: default_runtime_base_url(),
            api_key: None,
            timeout_secs: default_runtime_timeout(),
        }
    }
}

fn default_runtime_base_url() -> String {
    "https://general-runtime.example.com".to_string()
}

fn default_runtime_timeout() -> u64 {
    15
}

/// Provider graph API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Versioned graph API base, e.g. `https://graph.facebook.com/v18.0`.
    #[serde(default = "default_graph_base_url")]
    pub base_url: String,

    /// Provider app id, required for long-lived token exchange.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Provider app secret for token exchange.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Outbound send timeout in seconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: default_graph_base_url(),
            client_id: None,
            client_secret: None,
            send_timeout_secs: default_send_timeout(),
        }
    }
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

fn default_send_timeout() -> u64 {
    10
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "pontis.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Ingestion queue tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Events claimed per drain pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Claims permitted before an event is parked as failed.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Age after which a `processing` claim is considered abandoned and
    /// reverted to `pending`.
    #[serde(default = "default_stale_after")]
    pub stale_after_secs: u64,

    /// Background drain cadence.
    #[serde(default = "default_drain_interval")]
    pub drain_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            stale_after_secs: default_stale_after(),
            drain_interval_secs: default_drain_interval(),
        }
    }
}

fn default_batch_size() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_stale_after() -> u64 {
    300
}

fn default_drain_interval() -> u64 {
    30
}

/// Session TTL and history bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Days a session survives past its last interaction.
    #[serde(default = "default_ttl_days")]
    pub ttl_days: i64,

    /// History entries retained per session.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Expired-session sweep cadence.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_hours: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
            history_limit: default_history_limit(),
            cleanup_interval_hours: default_cleanup_interval(),
        }
    }
}

fn default_ttl_days() -> i64 {
    365
}

fn default_history_limit() -> usize {
    50
}

fn default_cleanup_interval() -> u64 {
    24
}

/// Credential refresh loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshConfig {
    /// Refresh pass cadence.
    #[serde(default = "default_refresh_interval")]
    pub interval_hours: u64,

    /// Connections expiring within this many days are refreshed.
    #[serde(default = "default_threshold_days")]
    pub threshold_days: i64,

    /// Lifetime assumed for an exchanged token when the provider omits
    /// `expires_in`.
    #[serde(default = "default_fallback_ttl_days")]
    pub fallback_ttl_days: i64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_refresh_interval(),
            threshold_days: default_threshold_days(),
            fallback_ttl_days: default_fallback_ttl_days(),
        }
    }
}

fn default_refresh_interval() -> u64 {
    24
}

fn default_threshold_days() -> i64 {
    7
}

fn default_fallback_ttl_days() -> i64 {
    60
}
