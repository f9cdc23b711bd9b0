// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! The event endpoint reads the **raw** request body before anything
//! parses it: the X-Hub signature is computed over those exact bytes.
//! After a successful enqueue the provider always gets a 200, even when
//! later processing fails, so it never retries on our internal errors.

use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use pontis_core::{Platform, PontisError, SignatureError};
use pontis_storage::queries::{erasure, queue, tenants, webhooks};
use pontis_webhook::{
    collect_events, confirmation_code, parse_signed_request, respond_to_challenge,
    verify_signature, ChallengeError, VerifyQuery,
};
use pontis_worker::{drain, sweep_expired_sessions};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::state::AppState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}

fn error_json(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            status: "error",
            error: error.into(),
        }),
    )
        .into_response()
}

/// GET `/api/webhooks/{tenant}/{platform}/{nonce}`
///
/// Subscription verification. Echoes `hub.challenge` as plain text when
/// the submitted token matches the tenant's active registration.
pub async fn verify_webhook(
    State(state): State<AppState>,
    Path((tenant_id, platform, _nonce)): Path<(String, String, String)>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    if Platform::from_str(&platform).is_err() {
        return error_json(StatusCode::BAD_REQUEST, "unknown platform");
    }

    // No fallback tokens: a lookup failure fails the handshake closed.
    let registered_token = match webhooks::find_active(&state.db, &tenant_id, &platform).await {
        Ok(registration) => registration.map(|r| r.verification_token),
        Err(e) => {
            warn!(error = %e, %tenant_id, "registration lookup failed during handshake");
            None
        }
    };

    match respond_to_challenge(&query, registered_token.as_deref()) {
        Ok(challenge) => {
            info!(%tenant_id, %platform, "webhook verified");
            (StatusCode::OK, [("content-type", "text/plain")], challenge).into_response()
        }
        Err(ChallengeError::InvalidRequest) => {
            error_json(StatusCode::BAD_REQUEST, "invalid verification request")
        }
        Err(ChallengeError::TokenMismatch) => {
            warn!(%tenant_id, %platform, "webhook verification token mismatch");
            error_json(StatusCode::UNAUTHORIZED, "verification token mismatch")
        }
    }
}

/// Response body for the event endpoint.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub status: &'static str,
    pub queued: usize,
    pub processed: usize,
}

/// POST `/api/webhooks/{tenant}/{platform}/{nonce}`
///
/// Event ingestion: authenticate the signature over the raw bytes, parse,
/// normalize the envelope, and durably queue each message.
pub async fn ingest_events(
    State(state): State<AppState>,
    Path((tenant_id, platform, _nonce)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Ok(platform) = Platform::from_str(&platform) else {
        return error_json(StatusCode::BAD_REQUEST, "unknown platform");
    };

    if state.config.webhook.verify_signatures {
        let Some(ref app_secret) = state.config.webhook.app_secret else {
            // Startup validation makes this unreachable; fail closed anyway.
            return error_json(StatusCode::UNAUTHORIZED, "signature checking unavailable");
        };
        let sha256_header = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok());
        let sha1_header = headers.get("x-hub-signature").and_then(|v| v.to_str().ok());

        if let Err(e) = verify_signature(app_secret, &body, sha256_header, sha1_header) {
            warn!(%tenant_id, error = %e, "webhook signature rejected");
            let status = match e {
                SignatureError::MalformedHeader => StatusCode::BAD_REQUEST,
                SignatureError::Missing | SignatureError::Invalid => StatusCode::UNAUTHORIZED,
            };
            return error_json(status, e.to_string());
        }
    } else {
        warn!(%tenant_id, "signature verification disabled; accepting unverified event");
    }

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => return error_json(StatusCode::BAD_REQUEST, format!("malformed payload: {e}")),
    };

    match tenants::get_active_tenant(&state.db, &tenant_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return error_json(StatusCode::NOT_FOUND, "unknown tenant"),
        Err(e) => {
            warn!(error = %e, "tenant lookup failed");
            // Enqueue is impossible; still never a 5xx back to the provider.
            return (
                StatusCode::OK,
                Json(ErrorResponse {
                    status: "error",
                    error: "data service unavailable".to_string(),
                }),
            )
                .into_response();
        }
    }

    let envelopes = collect_events(platform, &payload);
    let mut queued = 0usize;
    for envelope in &envelopes {
        let event = queue::NewQueuedEvent {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.clone(),
            platform: platform.to_string(),
            sender_id: envelope.sender_id.clone(),
            recipient_id: envelope.recipient_id.clone(),
            raw_payload: envelope.raw.to_string(),
            event_ts: envelope.event_ts.clone(),
        };
        match queue::enqueue_event(&state.db, &event).await {
            Ok(()) => queued += 1,
            Err(e) => {
                warn!(error = %e, "enqueue failed");
                return (
                    StatusCode::OK,
                    Json(ErrorResponse {
                        status: "error",
                        error: format!("enqueued {queued} of {}", envelopes.len()),
                    }),
                )
                    .into_response();
            }
        }
    }

    info!(%tenant_id, %platform, queued, "events queued");
    (
        StatusCode::OK,
        Json(IngestResponse {
            status: "ok",
            queued,
            processed: 0,
        }),
    )
        .into_response()
}

/// Query parameters for `/api/drain`.
#[derive(Debug, Deserialize)]
pub struct DrainQuery {
    #[serde(rename = "batchSize")]
    pub batch_size: Option<u32>,
}

/// Response body for `/api/drain`.
#[derive(Debug, Serialize)]
pub struct DrainResponse {
    pub status: &'static str,
    pub processed: usize,
    pub results: Vec<pontis_worker::EventResult>,
}

/// GET/POST `/api/drain` — run one drain pass (operator or cron).
pub async fn drain_queue(
    State(state): State<AppState>,
    Query(query): Query<DrainQuery>,
) -> Response {
    let batch_size = query.batch_size.unwrap_or(state.config.queue.batch_size);
    match drain(
        &state.worker,
        batch_size,
        state.config.queue.max_retries,
        state.config.queue.stale_after_secs,
    )
    .await
    {
        Ok(report) => (
            StatusCode::OK,
            Json(DrainResponse {
                status: "ok",
                processed: report.processed,
                results: report.results,
            }),
        )
            .into_response(),
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Response body for `/api/session-cleanup`.
#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub cleaned: usize,
}

/// GET/POST `/api/session-cleanup` — sweep lapsed sessions.
pub async fn session_cleanup(State(state): State<AppState>) -> Response {
    match sweep_expired_sessions(&state.db).await {
        Ok(cleaned) => (StatusCode::OK, Json(CleanupResponse { cleaned })).into_response(),
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Form body of the data-deletion callback.
#[derive(Debug, Deserialize)]
pub struct DataDeletionForm {
    pub signed_request: String,
}

/// Response body for `/api/data-deletion`.
#[derive(Debug, Serialize)]
pub struct DataDeletionResponse {
    pub url: String,
    pub confirmation_code: String,
}

/// POST `/api/data-deletion` — provider-initiated erasure callback.
///
/// The signed request is verified against the app secret before anything
/// is deleted; an unverifiable request changes nothing.
pub async fn data_deletion(
    State(state): State<AppState>,
    Form(form): Form<DataDeletionForm>,
) -> Response {
    let Some(ref app_secret) = state.config.webhook.app_secret else {
        return error_json(StatusCode::INTERNAL_SERVER_ERROR, "app secret not configured");
    };

    let request = match parse_signed_request(&form.signed_request, app_secret) {
        Ok(request) => request,
        Err(PontisError::Signature(_)) => {
            warn!("data-deletion signed request failed verification");
            return error_json(StatusCode::BAD_REQUEST, "invalid signed request signature");
        }
        Err(e) => return error_json(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match erasure::erase_participant(&state.db, &request.user_id).await {
        Ok(report) => {
            info!(user_id = %request.user_id, erased = report.total(), "erasure completed");
            let code = confirmation_code(&mut StdRng::from_entropy());
            (
                StatusCode::OK,
                Json(DataDeletionResponse {
                    url: format!(
                        "{}/deletion-status?code={code}",
                        state.config.server.public_url.trim_end_matches('/')
                    ),
                    confirmation_code: code,
                }),
            )
                .into_response()
        }
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Response body for `/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET `/health` — unauthenticated liveness probe.
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
