// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! All control endpoints live under `/api`; the liveness probe sits at the
//! root. CORS is permissive across the surface, matching the provider's
//! cross-origin webhook delivery.

use axum::routing::{get, post};
use axum::Router;
use pontis_core::PontisError;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::handlers;
use crate::state::AppState;

/// Build the full route table.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/api/webhooks/{tenant}/{platform}/{nonce}",
            get(handlers::verify_webhook).post(handlers::ingest_events),
        )
        .route(
            "/api/drain",
            get(handlers::drain_queue).post(handlers::drain_queue),
        )
        .route(
            "/api/session-cleanup",
            get(handlers::session_cleanup).post(handlers::session_cleanup),
        )
        .route("/api/data-deletion", post(handlers::data_deletion))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn start_server(host: &str, port: u16, state: AppState) -> Result<(), PontisError> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PontisError::Network {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("gateway listening on {addr}");

    axum::serve(listener, build_router(state))
        .await
        .map_err(|e| PontisError::Network {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use hmac::{Hmac, Mac};
    use pontis_config::PontisConfig;
    use pontis_graph::GraphClient;
    use pontis_runtime::RuntimeClient;
    use pontis_storage::models::WebhookRegistration;
    use pontis_storage::queries::{queue, sessions, tenants, webhooks};
    use pontis_storage::Database;
    use pontis_worker::Worker;
    use sha2::Sha256;
    use std::sync::Arc;
    use tempfile::tempdir;

    const SECRET: &str = "test-app-secret";

    async fn spawn_gateway() -> (String, Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("gw.db").to_str().unwrap())
            .await
            .unwrap();
        tenants::insert_tenant(&db, "T1", "op@example.com", "customer")
            .await
            .unwrap();
        webhooks::insert_registration(
            &db,
            &WebhookRegistration {
                id: "w1".to_string(),
                tenant_id: "T1".to_string(),
                platform: "page".to_string(),
                verification_token: "tkA".to_string(),
                webhook_url: None,
                generated_url: None,
                is_active: true,
                created_at: String::new(),
            },
        )
        .await
        .unwrap();

        let mut config = PontisConfig::default();
        config.webhook.app_secret = Some(SECRET.to_string());
        config.server.public_url = "https://bridge.example.com".to_string();

        let runtime = RuntimeClient::new("http://127.0.0.1:9".to_string(), 1).unwrap();
        let graph = GraphClient::new("http://127.0.0.1:9".to_string(), 1).unwrap();
        let worker = Arc::new(Worker::new(
            db.clone(),
            runtime,
            graph,
            "vf-default".to_string(),
            365,
            50,
        ));
        let state = AppState::new(db.clone(), worker, Arc::new(config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        (format!("http://{addr}"), db, dir)
    }

    fn sign_body(body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn page_body() -> Vec<u8> {
        serde_json::json!({
            "object": "page",
            "entry": [{"messaging": [{
                "sender": {"id": "P1"},
                "recipient": {"id": "R1"},
                "timestamp": 1700000000000i64,
                "message": {"mid": "m1", "text": "hello"}
            }]}]
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn verification_handshake_echoes_challenge() {
        let (base, _db, _dir) = spawn_gateway().await;

        let url = format!(
            "{base}/api/webhooks/T1/page/xyz?hub.mode=subscribe&hub.verify_token=tkA&hub.challenge=C123"
        );
        let response = reqwest::get(&url).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert_eq!(response.text().await.unwrap(), "C123");
    }

    #[tokio::test]
    async fn handshake_rejects_bad_token_and_bad_mode() {
        let (base, _db, _dir) = spawn_gateway().await;

        let url = format!(
            "{base}/api/webhooks/T1/page/xyz?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=C1"
        );
        assert_eq!(reqwest::get(&url).await.unwrap().status(), 401);

        let url = format!(
            "{base}/api/webhooks/T1/page/xyz?hub.mode=unsubscribe&hub.verify_token=tkA&hub.challenge=C1"
        );
        assert_eq!(reqwest::get(&url).await.unwrap().status(), 400);
    }

    #[tokio::test]
    async fn wrong_method_is_405() {
        let (base, _db, _dir) = spawn_gateway().await;
        let client = reqwest::Client::new();
        let response = client
            .delete(format!("{base}/api/webhooks/T1/page/xyz"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 405);
    }

    #[tokio::test]
    async fn signed_event_is_queued_atomically() {
        let (base, db, _dir) = spawn_gateway().await;
        let body = page_body();
        let signature = sign_body(&body);

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{base}/api/webhooks/T1/page/xyz"))
            .header("x-hub-signature-256", signature)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["queued"], 1);

        let claimed = queue::claim_batch(&db, 5, 3).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].tenant_id, "T1");
        assert_eq!(claimed[0].sender_id, "P1");
        assert_eq!(claimed[0].recipient_id, "R1");
    }

    #[tokio::test]
    async fn invalid_signature_persists_nothing() {
        let (base, db, _dir) = spawn_gateway().await;
        let body = page_body();

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{base}/api/webhooks/T1/page/xyz"))
            .header("x-hub-signature-256", "sha256=00ff00ff")
            .body(body.clone())
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);

        // Missing header also fails closed.
        let response = client
            .post(format!("{base}/api/webhooks/T1/page/xyz"))
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);

        assert!(queue::claim_batch(&db, 5, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn echo_events_acknowledge_without_queueing() {
        let (base, db, _dir) = spawn_gateway().await;
        let body = serde_json::json!({
            "object": "page",
            "entry": [{"messaging": [{
                "sender": {"id": "R1"},
                "recipient": {"id": "P1"},
                "timestamp": 1700000000000i64,
                "message": {"mid": "m1", "text": "hello", "is_echo": true}
            }]}]
        })
        .to_string()
        .into_bytes();
        let signature = sign_body(&body);

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{base}/api/webhooks/T1/page/xyz"))
            .header("x-hub-signature-256", signature)
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["queued"], 0);
        assert!(queue::claim_batch(&db, 5, 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_and_unknown_tenant_are_4xx() {
        let (base, _db, _dir) = spawn_gateway().await;
        let client = reqwest::Client::new();

        let body = b"not json".to_vec();
        let signature = sign_body(&body);
        let response = client
            .post(format!("{base}/api/webhooks/T1/page/xyz"))
            .header("x-hub-signature-256", signature)
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);

        let body = page_body();
        let signature = sign_body(&body);
        let response = client
            .post(format!("{base}/api/webhooks/nobody/page/xyz"))
            .header("x-hub-signature-256", signature)
            .body(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn session_cleanup_reports_count() {
        let (base, db, _dir) = spawn_gateway().await;
        let session = sessions::get_or_create(&db, "T1", "p1", "page", 365)
            .await
            .unwrap();
        let id = session.id.clone();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE sessions SET expires_at = '2020-01-01T00:00:00.000Z' WHERE id = ?1",
                    rusqlite::params![id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let response = reqwest::get(format!("{base}/api/session-cleanup")).await.unwrap();
        assert_eq!(response.status(), 200);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["cleaned"], 1);
    }

    #[tokio::test]
    async fn data_deletion_verifies_and_erases() {
        let (base, db, _dir) = spawn_gateway().await;
        sessions::get_or_create(&db, "T1", "U42", "page", 365)
            .await
            .unwrap();

        let payload = serde_json::json!({"user_id": "U42", "algorithm": "HMAC-SHA256"});
        let payload_part = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(payload_part.as_bytes());
        let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{base}/api/data-deletion"))
            .form(&[("signed_request", format!("{sig_part}.{payload_part}"))])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let json: serde_json::Value = response.json().await.unwrap();
        let code = json["confirmation_code"].as_str().unwrap();
        assert!(code.starts_with("DEL"));
        assert_eq!(code.len(), 11);
        assert!(json["url"]
            .as_str()
            .unwrap()
            .starts_with("https://bridge.example.com/deletion-status?code=DEL"));

        // Tampered envelope is rejected.
        let response = client
            .post(format!("{base}/api/data-deletion"))
            .form(&[("signed_request", format!("{sig_part}.{payload_part}x"))])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn health_endpoint_is_public() {
        let (base, _db, _dir) = spawn_gateway().await;
        let response = reqwest::get(format!("{base}/health")).await.unwrap();
        assert_eq!(response.status(), 200);
        let json: serde_json::Value = response.json().await.unwrap();
        assert_eq!(json["status"], "ok");
    }
}
