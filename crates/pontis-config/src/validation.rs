// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Secrets are checked separately by [`validate_secrets`] so
//! that offline tooling (config inspection, tests) can run without them.

use crate::diagnostic::ConfigError;
use crate::model::PontisConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &PontisConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let addr = config.server.host.trim();
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{addr}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.server.public_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.public_url must not be empty".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.runtime.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "runtime.base_url must not be empty".to_string(),
        });
    }

    if config.graph.base_url.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "graph.base_url must not be empty".to_string(),
        });
    }

    if config.queue.batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.batch_size must be at least 1".to_string(),
        });
    }

    if config.queue.max_retries == 0 {
        errors.push(ConfigError::Validation {
            message: "queue.max_retries must be at least 1".to_string(),
        });
    }

    if config.session.ttl_days < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "session.ttl_days must be at least 1, got {}",
                config.session.ttl_days
            ),
        });
    }

    if config.session.history_limit == 0 {
        errors.push(ConfigError::Validation {
            message: "session.history_limit must be at least 1".to_string(),
        });
    }

    if config.refresh.threshold_days < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "refresh.threshold_days must be non-negative, got {}",
                config.refresh.threshold_days
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate that the secrets a running bridge cannot operate without are
/// present. Called at serve time, after [`validate_config`].
pub fn validate_secrets(config: &PontisConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.webhook.verify_signatures && config.webhook.app_secret.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "webhook.app_secret".to_string(),
        });
    }

    if config.runtime.api_key.is_none() {
        errors.push(ConfigError::MissingKey {
            key: "runtime.api_key".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
