// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payload normalization across the two provider variants.
//!
//! [`collect_events`] walks the webhook envelope and yields one
//! [`EventEnvelope`] per inbound message, dropping echoes and non-message
//! changes. [`normalize`] turns a stored raw event back into a
//! [`NormalizedMessage`]; it is a pure function of its input, so
//! re-normalizing a queued payload always produces the same value.

use pontis_core::time::millis_to_iso;
use pontis_core::{Attachment, MessageKind, NormalizedMessage, Platform};
use serde_json::Value;
use tracing::debug;

/// One inbound message lifted out of the webhook envelope, ready to queue.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub sender_id: String,
    pub recipient_id: String,
    /// Canonical timestamp of the provider event.
    pub event_ts: String,
    /// Provider message id, when the payload carries one.
    pub provider_message_id: Option<String>,
    /// The individual event object, persisted verbatim as the queue payload.
    pub raw: Value,
}

/// Walk a webhook POST body and collect the messages it carries.
///
/// Echo events (`message.is_echo == true`) and photo-variant changes whose
/// `field` is not `"messages"` are dropped here, before anything is queued.
pub fn collect_events(platform: Platform, payload: &Value) -> Vec<EventEnvelope> {
    let entries = payload
        .get("entry")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut events = Vec::new();
    for entry in entries {
        match platform {
            Platform::Page => collect_page_entry(entry, &mut events),
            Platform::Photo => collect_photo_entry(entry, &mut events),
        }
    }
    events
}

fn collect_page_entry(entry: &Value, events: &mut Vec<EventEnvelope>) {
    let messaging = entry
        .get("messaging")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for event in messaging {
        if event
            .pointer("/message/is_echo")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            debug!("dropping echo event");
            continue;
        }
        let (Some(sender), Some(recipient)) = (
            event.pointer("/sender/id").and_then(Value::as_str),
            event.pointer("/recipient/id").and_then(Value::as_str),
        ) else {
            debug!("skipping messaging event without sender/recipient");
            continue;
        };
        let event_ts = event
            .get("timestamp")
            .and_then(Value::as_i64)
            .map(millis_to_iso)
            .unwrap_or_else(|| millis_to_iso(0));
        events.push(EventEnvelope {
            sender_id: sender.to_string(),
            recipient_id: recipient.to_string(),
            event_ts,
            provider_message_id: event
                .pointer("/message/mid")
                .and_then(Value::as_str)
                .map(str::to_string),
            raw: event.clone(),
        });
    }
}

fn collect_photo_entry(entry: &Value, events: &mut Vec<EventEnvelope>) {
    let changes = entry
        .get("changes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for change in changes {
        if change.get("field").and_then(Value::as_str) != Some("messages") {
            debug!("skipping non-message change");
            continue;
        }
        let Some(value) = change.get("value") else {
            continue;
        };
        let (Some(sender), Some(recipient)) = (
            value.pointer("/sender/id").and_then(Value::as_str),
            value.pointer("/recipient/id").and_then(Value::as_str),
        ) else {
            debug!("skipping change without sender/recipient");
            continue;
        };
        let message = value.pointer("/messages/0");
        let event_ts = message
            .and_then(|m| m.get("timestamp"))
            .and_then(timestamp_seconds)
            .map(|secs| millis_to_iso(secs.saturating_mul(1000)))
            .or_else(|| entry.get("time").and_then(Value::as_i64).map(millis_to_iso))
            .unwrap_or_else(|| millis_to_iso(0));
        events.push(EventEnvelope {
            sender_id: sender.to_string(),
            recipient_id: recipient.to_string(),
            event_ts,
            provider_message_id: message
                .and_then(|m| m.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            raw: value.clone(),
        });
    }
}

/// Photo-variant timestamps arrive as epoch seconds, sometimes as a string.
fn timestamp_seconds(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Normalize a stored raw event into the canonical message shape.
pub fn normalize(platform: Platform, raw: &Value) -> NormalizedMessage {
    match platform {
        Platform::Page => normalize_page(raw),
        Platform::Photo => normalize_photo(raw),
    }
}

fn normalize_page(event: &Value) -> NormalizedMessage {
    if let Some(postback) = event.get("postback") {
        let text = postback
            .get("payload")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| postback.get("title").and_then(Value::as_str))
            .unwrap_or_default();
        if !text.is_empty() {
            let mut msg = NormalizedMessage::text_only(text, MessageKind::Postback);
            msg.metadata = event_metadata(event);
            return msg;
        }
    }

    if let Some(message) = event.get("message") {
        return normalize_message_body(message, Platform::Page, event_metadata(event));
    }

    NormalizedMessage::text_only(unsupported_text(Platform::Page), MessageKind::Unsupported)
}

fn normalize_photo(value: &Value) -> NormalizedMessage {
    let Some(message) = value.pointer("/messages/0") else {
        return NormalizedMessage::text_only(
            unsupported_text(Platform::Photo),
            MessageKind::Unsupported,
        );
    };
    let metadata = serde_json::json!({
        "mid": message.get("id").cloned().unwrap_or(Value::Null),
        "timestamp": message.get("timestamp").cloned().unwrap_or(Value::Null),
    });
    normalize_message_body(message, Platform::Photo, metadata)
}

/// Shared message-object handling: quick-reply taps, text, attachments.
fn normalize_message_body(
    message: &Value,
    platform: Platform,
    metadata: Value,
) -> NormalizedMessage {
    let quick_replies = message
        .get("quick_replies")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|q| {
                    q.get("payload")
                        .or_else(|| q.get("title"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .collect()
        })
        .unwrap_or_default();

    // A quick-reply tap carries the tapped payload.
    if let Some(payload) = message
        .pointer("/quick_reply/payload")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        return NormalizedMessage {
            text: payload.to_string(),
            kind: MessageKind::QuickReply,
            attachments: Vec::new(),
            quick_replies,
            metadata,
        };
    }

    let text = message_text(message, platform);
    let attachments: Vec<Attachment> = message
        .get("attachments")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(describe_attachment).collect())
        .unwrap_or_default();

    if let Some(text) = text {
        return NormalizedMessage {
            text,
            kind: MessageKind::Text,
            attachments,
            quick_replies,
            metadata,
        };
    }

    // No text: the first attachment's description stands in.
    if let Some(first) = attachments.first() {
        return NormalizedMessage {
            text: first.description.clone(),
            kind: MessageKind::Attachment,
            attachments,
            quick_replies,
            metadata,
        };
    }

    NormalizedMessage {
        text: unsupported_text(platform),
        kind: MessageKind::Unsupported,
        attachments,
        quick_replies,
        metadata,
    }
}

/// Provider-specific leftovers carried on every normalized page event.
fn event_metadata(event: &Value) -> Value {
    serde_json::json!({
        "mid": event.pointer("/message/mid").cloned().unwrap_or(Value::Null),
        "timestamp": event.get("timestamp").cloned().unwrap_or(Value::Null),
    })
}

/// Text location differs per variant: page events carry `message.text`,
/// photo events nest it at `message.text.body`.
fn message_text(message: &Value, platform: Platform) -> Option<String> {
    let value = message.get("text")?;
    let text = match platform {
        Platform::Page => value.as_str(),
        Platform::Photo => value
            .get("body")
            .and_then(Value::as_str)
            .or_else(|| value.as_str()),
    }?;
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}

fn describe_attachment(attachment: &Value) -> Attachment {
    let kind = attachment
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let url = attachment
        .pointer("/payload/url")
        .and_then(Value::as_str)
        .map(str::to_string);

    match kind {
        "image" | "audio" | "video" | "file" => {
            let label = capitalize(kind);
            let description = match &url {
                Some(url) => format!("[{label}: {url}]"),
                None => format!("[{label}]"),
            };
            Attachment {
                kind: kind.to_string(),
                description,
                url,
            }
        }
        "location" => {
            let lat = attachment
                .pointer("/payload/coordinates/lat")
                .or_else(|| attachment.pointer("/payload/latitude"))
                .and_then(Value::as_f64)
                .unwrap_or_default();
            let long = attachment
                .pointer("/payload/coordinates/long")
                .or_else(|| attachment.pointer("/payload/longitude"))
                .and_then(Value::as_f64)
                .unwrap_or_default();
            Attachment {
                kind: "location".to_string(),
                description: format!("[Location: {lat},{long}]"),
                url,
            }
        }
        other => Attachment {
            kind: "unsupported".to_string(),
            description: format!("[Unsupported: {other}]"),
            url,
        },
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn unsupported_text(platform: Platform) -> String {
    format!("[Unsupported {platform} message type]")
}
