// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Pontis messaging bridge.
//!
//! This crate provides the error type, platform and message domain types,
//! the opaque session-context model, and timestamp helpers shared by every
//! other crate in the workspace.

pub mod context;
pub mod error;
pub mod time;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use context::SessionContext;
pub use error::{PontisError, SignatureError};
pub use types::{Attachment, MessageKind, NormalizedMessage, Platform};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pontis_error_has_all_variants() {
        let _config = PontisError::Config("test".into());
        let _storage = PontisError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _sig = PontisError::Signature(SignatureError::Missing);
        let _payload = PontisError::MalformedPayload("test".into());
        let _tenant = PontisError::UnknownTenant("t1".into());
        let _conn = PontisError::MissingConnection {
            tenant_id: "t1".into(),
            platform: "page".into(),
            asset_id: "p1".into(),
        };
        let _binding = PontisError::MissingBinding("t1".into());
        let _network = PontisError::Network {
            message: "test".into(),
            source: None,
        };
        let _upstream = PontisError::Upstream {
            status: 503,
            message: "test".into(),
        };
        let _timeout = PontisError::Timeout {
            duration: std::time::Duration::from_secs(15),
        };
        let _internal = PontisError::Internal("test".into());
    }

    #[test]
    fn platform_display_round_trips() {
        use std::str::FromStr;

        for platform in [Platform::Page, Platform::Photo] {
            let s = platform.to_string();
            let parsed = Platform::from_str(&s).expect("should parse back");
            assert_eq!(platform, parsed);
        }
    }

    #[test]
    fn platform_serialization() {
        let json = serde_json::to_string(&Platform::Photo).expect("should serialize");
        assert_eq!(json, "\"photo\"");
        let parsed: Platform = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, Platform::Photo);
    }
}
