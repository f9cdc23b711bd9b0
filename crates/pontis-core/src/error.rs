// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Pontis bridge.

use thiserror::Error;

/// Reason a webhook signature check rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// No signature header was present on the request.
    #[error("missing signature header")]
    Missing,
    /// The header did not match the `<algo>=<hex>` format.
    #[error("malformed signature header")]
    MalformedHeader,
    /// The computed HMAC did not match the submitted digest.
    #[error("invalid signature")]
    Invalid,
}

/// The primary error type used across all Pontis crates.
#[derive(Debug, Error)]
pub enum PontisError {
    /// Configuration errors (invalid TOML, missing required secrets, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Data-service errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Webhook signature verification failed.
    #[error("signature rejected: {0}")]
    Signature(SignatureError),

    /// Inbound payload could not be parsed into a known event shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The tenant named in the webhook URL does not exist.
    #[error("unknown tenant: {0}")]
    UnknownTenant(String),

    /// No social connection matches the event's recipient asset.
    #[error("no connection for tenant {tenant_id} on {platform} asset {asset_id}")]
    MissingConnection {
        tenant_id: String,
        platform: String,
        asset_id: String,
    },

    /// The tenant has no AI project binding.
    #[error("no AI binding for tenant {0}")]
    MissingBinding(String),

    /// Network-level failure on an outbound call.
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Upstream service returned a non-success HTTP status.
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PontisError {
    /// Wraps a storage-layer cause.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PontisError::Storage {
            source: Box::new(source),
        }
    }
}
