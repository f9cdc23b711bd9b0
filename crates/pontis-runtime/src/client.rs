// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the runtime's `interact` endpoint.
//!
//! One POST per user turn; the caller owns retry policy, so this client is
//! deliberately single-shot and maps transport failures onto the
//! workspace error type for transient classification.

use std::time::Duration;

use pontis_core::PontisError;
use serde_json::{Map, Value};
use tracing::debug;

use crate::types::AiRecord;

/// Client for the conversational-AI runtime.
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl RuntimeClient {
    /// Creates a client with the configured base URL and per-request timeout.
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self, PontisError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PontisError::Network {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Send one user turn and return the runtime's response records.
    ///
    /// `variables` is the flattened session context; `api_key` is the
    /// per-tenant key or the global default.
    pub async fn interact(
        &self,
        tenant_id: &str,
        api_key: &str,
        text: &str,
        variables: &Map<String, Value>,
    ) -> Result<Vec<AiRecord>, PontisError> {
        let url = format!("{}/state/user/{tenant_id}/interact", self.base_url);
        let body = serde_json::json!({
            "action": {"type": "text", "payload": text},
            "config": {"tts": false, "stripSSML": true},
            "state": {"variables": variables},
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout))?;

        let status = response.status();
        debug!(status = %status, tenant_id, "runtime response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PontisError::Upstream {
                status: status.as_u16(),
                message: truncate(&body, 512),
            });
        }

        let records: Vec<Value> =
            response.json().await.map_err(|e| PontisError::Network {
                message: format!("failed to parse runtime response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(AiRecord::from_response(&records))
    }
}

fn map_send_error(e: reqwest::Error, timeout: Duration) -> PontisError {
    if e.is_timeout() {
        PontisError::Timeout { duration: timeout }
    } else {
        PontisError::Network {
            message: format!("runtime request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

fn truncate(s: &str, limit: usize) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> RuntimeClient {
        RuntimeClient::new(base_url.to_string(), 15).unwrap()
    }

    #[tokio::test]
    async fn interact_posts_action_and_parses_records() {
        let server = MockServer::start().await;
        let response = serde_json::json!([
            {"type": "text", "payload": {"message": "Hello back"}},
            {"type": "set-variables", "payload": {"variables": {"greeted": true}}}
        ]);

        Mock::given(method("POST"))
            .and(path("/state/user/t1/interact"))
            .and(header("authorization", "Bearer vf-key"))
            .and(body_partial_json(serde_json::json!({
                "action": {"type": "text", "payload": "hello"},
                "config": {"tts": false, "stripSSML": true}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(&response))
            .mount(&server)
            .await;

        let records = client(&server.uri())
            .interact("t1", "vf-key", "hello", &Map::new())
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], AiRecord::Text { message: "Hello back".into() });
    }

    #[tokio::test]
    async fn interact_sends_session_variables() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/state/user/t1/interact"))
            .and(body_partial_json(serde_json::json!({
                "state": {"variables": {"plan": "pro"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let mut variables = Map::new();
        variables.insert("plan".into(), serde_json::json!("pro"));
        let records = client(&server.uri())
            .interact("t1", "vf-key", "hi", &variables)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn upstream_status_maps_to_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/state/user/t1/interact"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .interact("t1", "vf-key", "hi", &Map::new())
            .await
            .unwrap_err();
        match err {
            PontisError::Upstream { status, message } => {
                assert_eq!(status, 503);
                assert!(message.contains("overloaded"));
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn auth_failure_maps_to_upstream_401() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/state/user/t1/interact"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .interact("t1", "bad", "hi", &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PontisError::Upstream { status: 401, .. }));
    }
}
