// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed-request parsing for provider-initiated data-deletion callbacks.
//!
//! The envelope is `<sig>.<payload>`, both base64url. The signature is
//! HMAC-SHA256 over the payload segment (the encoded string, not the
//! decoded JSON) keyed with the app secret, and verification is mandatory:
//! an unverifiable request never reaches the erasure path.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use pontis_core::{PontisError, SignatureError};
use rand::Rng;
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// A verified erasure request.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    /// Provider-side id of the user requesting erasure.
    pub user_id: String,
    /// Full decoded payload for auditing.
    pub payload: Value,
}

/// Parse and verify a `signed_request` form value.
pub fn parse_signed_request(
    signed: &str,
    app_secret: &str,
) -> Result<SignedRequest, PontisError> {
    let (sig_part, payload_part) = signed
        .split_once('.')
        .ok_or_else(|| PontisError::MalformedPayload("signed_request has no '.'".into()))?;

    let signature = decode_base64url(sig_part)
        .ok_or_else(|| PontisError::MalformedPayload("signature is not base64url".into()))?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| PontisError::Signature(SignatureError::Invalid))?;
    mac.update(payload_part.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| PontisError::Signature(SignatureError::Invalid))?;

    let payload_bytes = decode_base64url(payload_part)
        .ok_or_else(|| PontisError::MalformedPayload("payload is not base64url".into()))?;
    let payload: Value = serde_json::from_slice(&payload_bytes)
        .map_err(|e| PontisError::MalformedPayload(format!("payload is not JSON: {e}")))?;

    let user_id = payload
        .get("user_id")
        .and_then(Value::as_str)
        .ok_or_else(|| PontisError::MalformedPayload("payload has no user_id".into()))?
        .to_string();

    Ok(SignedRequest { user_id, payload })
}

/// Tolerates both padded and unpadded base64url.
fn decode_base64url(segment: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()
}

/// Opaque erasure confirmation code: `DEL` + 8 uppercase base36 chars.
pub fn confirmation_code<R: Rng>(rng: &mut R) -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let suffix: String = (0..8)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("DEL{suffix}")
}
