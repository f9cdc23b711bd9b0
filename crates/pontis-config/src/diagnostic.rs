// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration error diagnostics.

use thiserror::Error;

/// A configuration error surfaced to the operator at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    MissingKey {
        /// The missing key name, in `section.key` form.
        key: String,
    },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    Other(String),
}
