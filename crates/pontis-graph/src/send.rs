// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message sends through the provider graph API.
//!
//! Page-variant sends go to `POST {base}/me/messages`; photo-variant sends
//! go to `POST {base}/{account_id}/messages`. Both authenticate with the
//! connection's access token as a query parameter and carry
//! `messaging_type: "RESPONSE"`.

use std::time::Duration;

use pontis_core::{Platform, PontisError};
use serde_json::Value;
use tracing::debug;

use crate::reply::FormattedReply;

/// Client for the provider graph API.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    base_url: String,
    send_timeout: Duration,
}

impl GraphClient {
    /// Creates a client against the configured graph base URL.
    pub fn new(base_url: String, send_timeout_secs: u64) -> Result<Self, PontisError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PontisError::Network {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            send_timeout: Duration::from_secs(send_timeout_secs),
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    /// Deliver a reply to `recipient_id`. For the photo variant,
    /// `account_id` names the sending asset. Returns the provider message
    /// id when the response carries one.
    pub async fn send_reply(
        &self,
        platform: Platform,
        account_id: Option<&str>,
        access_token: &str,
        recipient_id: &str,
        reply: &FormattedReply,
    ) -> Result<Option<String>, PontisError> {
        let url = match platform {
            Platform::Page => format!("{}/me/messages", self.base_url),
            Platform::Photo => {
                let account = account_id.ok_or_else(|| {
                    PontisError::Internal("photo send requires an account id".into())
                })?;
                format!("{}/{account}/messages", self.base_url)
            }
        };

        let body = build_send_body(recipient_id, reply);
        let response = self
            .client
            .post(&url)
            .query(&[("access_token", access_token)])
            .timeout(self.send_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.send_timeout))?;

        let status = response.status();
        debug!(status = %status, %platform, "send response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PontisError::Upstream {
                status: status.as_u16(),
                message: truncate(&body, 512),
            });
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        Ok(body
            .get("message_id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

/// Build the wire body: `{recipient, message{text?, quick_replies?,
/// attachment?}, messaging_type}`.
fn build_send_body(recipient_id: &str, reply: &FormattedReply) -> Value {
    let mut message = serde_json::Map::new();
    if !reply.text.is_empty() {
        message.insert("text".into(), Value::String(reply.text.clone()));
    }
    if !reply.quick_replies.is_empty() {
        message.insert(
            "quick_replies".into(),
            serde_json::to_value(&reply.quick_replies).unwrap_or_default(),
        );
    }
    if let Some(ref url) = reply.attachment_url {
        message.insert(
            "attachment".into(),
            serde_json::json!({
                "type": "image",
                "payload": {"url": url, "is_reusable": false}
            }),
        );
    }

    serde_json::json!({
        "recipient": {"id": recipient_id},
        "message": Value::Object(message),
        "messaging_type": "RESPONSE",
    })
}

pub(crate) fn map_send_error(e: reqwest::Error, timeout: Duration) -> PontisError {
    if e.is_timeout() {
        PontisError::Timeout { duration: timeout }
    } else {
        PontisError::Network {
            message: format!("graph request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

pub(crate) fn truncate(s: &str, limit: usize) -> String {
    if s.len() <= limit {
        s.to_string()
    } else {
        let mut end = limit;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        s[..end].to_string()
    }
}
