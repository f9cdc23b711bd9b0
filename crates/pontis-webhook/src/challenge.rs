// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription-verification challenge handshake.
//!
//! The provider sends `GET ?hub.mode=subscribe&hub.verify_token=...&
//! hub.challenge=...`; a matching active registration earns a plain-text
//! echo of the challenge and nothing else.

use serde::Deserialize;

/// Query parameters of a verification GET.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Why a handshake was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeError {
    /// `hub.mode` was absent or not `subscribe`, or `hub.challenge` missing.
    InvalidRequest,
    /// The submitted token did not match any active registration.
    TokenMismatch,
}

/// Decide the handshake. `registered_token` is the active registration's
/// verification token for the tenant/platform named in the URL, or `None`
/// when no such registration exists (including when the data service is
/// unreachable: verification fails closed, there are no fallback tokens).
pub fn respond_to_challenge(
    query: &VerifyQuery,
    registered_token: Option<&str>,
) -> Result<String, ChallengeError> {
    if query.mode.as_deref() != Some("subscribe") {
        return Err(ChallengeError::InvalidRequest);
    }
    let challenge = query
        .challenge
        .as_deref()
        .ok_or(ChallengeError::InvalidRequest)?;

    let matches = match (query.verify_token.as_deref(), registered_token) {
        (Some(submitted), Some(registered)) => constant_time_eq(submitted, registered),
        _ => false,
    };
    if !matches {
        return Err(ChallengeError::TokenMismatch);
    }

    Ok(challenge.to_string())
}

/// Constant-time string comparison to prevent timing attacks on the
/// verification token.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
