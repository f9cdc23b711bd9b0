// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Pontis workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The two provider platform variants the bridge speaks.
///
/// Stored in the database as lowercase strings. Webhook configurations may
/// additionally use the literal `"any"` to match either platform; that value
/// never appears on events themselves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Page-messaging platform (events under `entry[].messaging[]`).
    Page,
    /// Photo-sharing platform (events under `entry[].changes[].value`).
    Photo,
}

/// Canonical kind of a normalized inbound message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Postback,
    QuickReply,
    Attachment,
    Unsupported,
}

/// A single attachment carried by a normalized message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Canonical attachment kind: image, audio, video, file, location, unsupported.
    pub kind: String,
    /// Human-readable description, e.g. `[Image: https://...]`.
    pub description: String,
    /// Source URL when the provider supplied one.
    pub url: Option<String>,
}

/// Canonical message shape produced by the normalizer from either
/// platform variant. Normalization is deterministic: the same raw payload
/// always yields an identical value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedMessage {
    /// Primary text content (never empty; falls back to an attachment
    /// description or an unsupported-type marker).
    pub text: String,
    /// What the participant did to produce this message.
    pub kind: MessageKind,
    /// Attachments, in provider order.
    pub attachments: Vec<Attachment>,
    /// Quick-reply payloads offered alongside the message, if any.
    pub quick_replies: Vec<String>,
    /// Provider-specific leftovers (message id, timestamps).
    pub metadata: serde_json::Value,
}

impl NormalizedMessage {
    /// A message of the given kind with plain text and no extras.
    pub fn text_only(text: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            text: text.into(),
            kind,
            attachments: Vec::new(),
            quick_replies: Vec::new(),
            metadata: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_kind_serializes_snake_case() {
        let json = serde_json::to_string(&MessageKind::QuickReply).unwrap();
        assert_eq!(json, "\"quick_reply\"");
    }

    #[test]
    fn normalized_message_round_trips() {
        let msg = NormalizedMessage {
            text: "[Image: https://cdn.example/pic.jpg]".into(),
            kind: MessageKind::Attachment,
            attachments: vec![Attachment {
                kind: "image".into(),
                description: "[Image: https://cdn.example/pic.jpg]".into(),
                url: Some("https://cdn.example/pic.jpg".into()),
            }],
            quick_replies: vec![],
            metadata: serde_json::json!({"mid": "m1"}),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: NormalizedMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
