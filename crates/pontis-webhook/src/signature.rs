// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! X-Hub signature verification.
//!
//! The HMAC is computed over the raw request body bytes exactly as
//! received; the gateway must not re-serialize the payload first.
//! `X-Hub-Signature-256` (HMAC-SHA256) is preferred; the legacy
//! `X-Hub-Signature` (HMAC-SHA1) is accepted only when the 256 header is
//! absent. Comparison is constant-time via `Mac::verify_slice`.

use hmac::{Hmac, Mac};
use pontis_core::SignatureError;
use sha1::Sha1;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;
type HmacSha1 = Hmac<Sha1>;

/// Which scheme authenticated the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Sha256,
    Sha1,
}

/// Verify a request body against the submitted X-Hub headers.
///
/// `sha256_header` / `sha1_header` are the raw values of
/// `X-Hub-Signature-256` and `X-Hub-Signature` respectively.
pub fn verify_signature(
    app_secret: &str,
    body: &[u8],
    sha256_header: Option<&str>,
    sha1_header: Option<&str>,
) -> Result<SignatureScheme, SignatureError> {
    if let Some(header) = sha256_header {
        let expected = decode_header(header, "sha256=")?;
        let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
            .map_err(|_| SignatureError::Invalid)?;
        mac.update(body);
        return match mac.verify_slice(&expected) {
            Ok(()) => Ok(SignatureScheme::Sha256),
            Err(_) => Err(SignatureError::Invalid),
        };
    }

    if let Some(header) = sha1_header {
        let expected = decode_header(header, "sha1=")?;
        let mut mac = HmacSha1::new_from_slice(app_secret.as_bytes())
            .map_err(|_| SignatureError::Invalid)?;
        mac.update(body);
        return match mac.verify_slice(&expected) {
            Ok(()) => Ok(SignatureScheme::Sha1),
            Err(_) => Err(SignatureError::Invalid),
        };
    }

    Err(SignatureError::Missing)
}

/// Strip the `<algo>=` prefix and hex-decode the digest.
fn decode_header(header: &str, prefix: &str) -> Result<Vec<u8>, SignatureError> {
    let hex_digest = header
        .strip_prefix(prefix)
        .ok_or(SignatureError::MalformedHeader)?;
    hex::decode(hex_digest).map_err(|_| SignatureError::MalformedHeader)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "app-secret";
    const BODY: &[u8] = br#"{"object":"page","entry":[]}"#;

    fn sign_sha256(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn sign_sha1(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn valid_sha256_signature_passes() {
        let header = sign_sha256(SECRET, BODY);
        let scheme = verify_signature(SECRET, BODY, Some(&header), None).unwrap();
        assert_eq!(scheme, SignatureScheme::Sha256);
    }

    #[test]
    fn sha1_accepted_only_when_sha256_absent() {
        let sha1 = sign_sha1(SECRET, BODY);
        let scheme = verify_signature(SECRET, BODY, None, Some(&sha1)).unwrap();
        assert_eq!(scheme, SignatureScheme::Sha1);

        // A present-but-wrong 256 header is not rescued by a valid sha1.
        let err = verify_signature(SECRET, BODY, Some("sha256=00ff"), Some(&sha1)).unwrap_err();
        assert_eq!(err, SignatureError::Invalid);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let header = sign_sha256("other-secret", BODY);
        let err = verify_signature(SECRET, BODY, Some(&header), None).unwrap_err();
        assert_eq!(err, SignatureError::Invalid);
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign_sha256(SECRET, BODY);
        let err = verify_signature(SECRET, b"tampered", Some(&header), None).unwrap_err();
        assert_eq!(err, SignatureError::Invalid);
    }

    #[test]
    fn missing_headers_fail_closed() {
        let err = verify_signature(SECRET, BODY, None, None).unwrap_err();
        assert_eq!(err, SignatureError::Missing);
    }

    #[test]
    fn malformed_headers_are_distinguished() {
        let err = verify_signature(SECRET, BODY, Some("md5=abcd"), None).unwrap_err();
        assert_eq!(err, SignatureError::MalformedHeader);

        let err = verify_signature(SECRET, BODY, Some("sha256=zzzz"), None).unwrap_err();
        assert_eq!(err, SignatureError::MalformedHeader);
    }
}
