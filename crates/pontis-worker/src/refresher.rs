// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential refresher.
//!
//! Connections whose token expires within the configured threshold are
//! exchanged for fresh long-lived tokens. Each pass reports per-connection
//! results; a failed exchange never blocks the rest of the batch.
//! Mutation of connection rows happens only here, serialized through the
//! storage writer thread.

use chrono::Duration;
use pontis_core::time::{days_until_expiry, iso_after, now_iso, parse_iso, ExpiryBand};
use pontis_core::PontisError;
use pontis_graph::GraphClient;
use pontis_storage::models::SocialConnection;
use pontis_storage::queries::connections;
use pontis_storage::Database;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of refreshing one connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub connection_id: String,
    pub platform: String,
    /// "ok" or "error".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_expiry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Provider app credentials used for the exchange.
#[derive(Debug, Clone)]
pub struct ExchangeCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// One refresh pass over every connection inside the expiry threshold.
pub async fn refresh_expiring(
    db: &Database,
    graph: &GraphClient,
    credentials: &ExchangeCredentials,
    threshold_days: i64,
    fallback_ttl_days: i64,
) -> Result<Vec<RefreshOutcome>, PontisError> {
    let expiring = connections::list_expiring(db, threshold_days).await?;
    info!(count = expiring.len(), threshold_days, "refresh pass starting");

    let mut outcomes = Vec::with_capacity(expiring.len());
    for connection in &expiring {
        if let Some(expiry) = parse_iso(&connection.token_expiry) {
            let days = days_until_expiry(expiry, chrono::Utc::now());
            info!(connection_id = %connection.id, days,
                  band = ?ExpiryBand::for_days(days), "connection approaching expiry");
        }
        outcomes.push(
            refresh_connection(db, graph, credentials, connection, fallback_ttl_days).await,
        );
    }
    Ok(outcomes)
}

/// Refresh a single connection (also the operator's on-demand entry).
pub async fn refresh_connection(
    db: &Database,
    graph: &GraphClient,
    credentials: &ExchangeCredentials,
    connection: &SocialConnection,
    fallback_ttl_days: i64,
) -> RefreshOutcome {
    let exchange = graph
        .exchange_long_lived_token(
            &credentials.client_id,
            &credentials.client_secret,
            &connection.access_token,
        )
        .await;

    match exchange {
        Ok(exchange) => {
            let new_expiry = match exchange.expires_in {
                Some(secs) => iso_after(Duration::seconds(secs)),
                None => iso_after(Duration::days(fallback_ttl_days)),
            };
            let refreshed_at = now_iso();
            if let Err(e) = connections::update_token(
                db,
                &connection.id,
                &exchange.access_token,
                &new_expiry,
                &refreshed_at,
            )
            .await
            {
                warn!(connection_id = %connection.id, error = %e,
                      "token exchanged but row update failed");
                return error_outcome(connection, e);
            }
            info!(connection_id = %connection.id, new_expiry = %new_expiry,
                  "connection token refreshed");
            RefreshOutcome {
                connection_id: connection.id.clone(),
                platform: connection.platform.clone(),
                status: "ok".to_string(),
                new_expiry: Some(new_expiry),
                error: None,
            }
        }
        Err(e) => {
            warn!(connection_id = %connection.id, error = %e, "token exchange failed");
            error_outcome(connection, e)
        }
    }
}

fn error_outcome(connection: &SocialConnection, error: PontisError) -> RefreshOutcome {
    RefreshOutcome {
        connection_id: connection.id.clone(),
        platform: connection.platform.clone(),
        status: "error".to_string(),
        new_expiry: None,
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pontis_core::time::{days_until_expiry, parse_iso};
    use pontis_storage::queries::tenants;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn connection(id: &str, token: &str, expiry: &str) -> SocialConnection {
        SocialConnection {
            id: id.to_string(),
            tenant_id: "t1".to_string(),
            platform: "page".to_string(),
            page_id: Some(format!("page-{id}")),
            account_id: None,
            access_token: token.to_string(),
            token_expiry: expiry.to_string(),
            refreshed_at: None,
            created_at: String::new(),
        }
    }

    fn credentials() -> ExchangeCredentials {
        ExchangeCredentials {
            client_id: "app-1".to_string(),
            client_secret: "app-secret".to_string(),
        }
    }

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("r.db").to_str().unwrap())
            .await
            .unwrap();
        tenants::insert_tenant(&db, "t1", "op@example.com", "customer")
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn refreshes_only_connections_inside_threshold() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/access_token"))
            .and(query_param("fb_exchange_token", "tok-soon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-fresh",
                "expires_in": 5_184_000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (db, _dir) = setup_db().await;
        let soon = iso_after(Duration::days(6));
        let later = iso_after(Duration::days(30));
        connections::insert_connection(&db, &connection("c-soon", "tok-soon", &soon))
            .await
            .unwrap();
        connections::insert_connection(&db, &connection("c-later", "tok-later", &later))
            .await
            .unwrap();

        let graph = GraphClient::new(server.uri(), 10).unwrap();
        let outcomes = refresh_expiring(&db, &graph, &credentials(), 7, 60)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].connection_id, "c-soon");
        assert_eq!(outcomes[0].status, "ok");

        // New expiry is ~60 days out and refreshed_at is stamped.
        let refreshed = connections::get_connection(&db, "c-soon")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.access_token, "tok-fresh");
        assert!(refreshed.refreshed_at.is_some());
        let days = days_until_expiry(
            parse_iso(&refreshed.token_expiry).unwrap(),
            chrono::Utc::now(),
        );
        assert!((58..=60).contains(&days), "expected ~60 days, got {days}");

        // The 30-day connection was not touched.
        let untouched = connections::get_connection(&db, "c-later")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.access_token, "tok-later");
        assert!(untouched.refreshed_at.is_none());
    }

    #[tokio::test]
    async fn failed_exchange_reports_error_and_leaves_row() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/access_token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let (db, _dir) = setup_db().await;
        let soon = iso_after(Duration::days(2));
        connections::insert_connection(&db, &connection("c1", "tok-bad", &soon))
            .await
            .unwrap();

        let graph = GraphClient::new(server.uri(), 10).unwrap();
        let outcomes = refresh_expiring(&db, &graph, &credentials(), 7, 60)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, "error");
        assert!(outcomes[0].error.as_deref().unwrap().contains("400"));

        let row = connections::get_connection(&db, "c1").await.unwrap().unwrap();
        assert_eq!(row.access_token, "tok-bad");
        assert_eq!(row.token_expiry, soon);
    }

    #[tokio::test]
    async fn missing_expires_in_uses_fallback_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-fresh"
            })))
            .mount(&server)
            .await;

        let (db, _dir) = setup_db().await;
        let soon = iso_after(Duration::days(1));
        connections::insert_connection(&db, &connection("c1", "tok-old", &soon))
            .await
            .unwrap();

        let graph = GraphClient::new(server.uri(), 10).unwrap();
        let outcome = refresh_connection(
            &db,
            &graph,
            &credentials(),
            &connections::get_connection(&db, "c1").await.unwrap().unwrap(),
            45,
        )
        .await;

        assert_eq!(outcome.status, "ok");
        let days = days_until_expiry(
            parse_iso(outcome.new_expiry.as_deref().unwrap()).unwrap(),
            chrono::Utc::now(),
        );
        assert!((43..=45).contains(&days), "expected ~45 days, got {days}");
    }
}
