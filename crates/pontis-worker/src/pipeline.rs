// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-event worker pipeline.
//!
//! Stages run in a fixed order against one claimed [`QueuedEvent`]; each
//! stage returns an outcome instead of nesting error handling, and the
//! orchestrator decides what the failure means for the event. Outbound
//! calls are wrapped in the retry core with stage-specific policies.
//!
//! A failed reply send after retries does not fail the event: the
//! assistant message is already persisted, the failure is traced, and the
//! event completes with an `undelivered` warning.

use std::str::FromStr;

use pontis_core::time::now_iso;
use pontis_core::{Platform, PontisError};
use pontis_graph::{format_reply, GraphClient};
use pontis_runtime::{extract_context_updates, RuntimeClient};
use pontis_storage::models::{MessageRow, QueuedEvent};
use pontis_storage::queries::{bindings, connections, conversations, messages, sessions, traces};
use pontis_storage::Database;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use strum::Display;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::retry::{is_transient, run_with_retry, RetryPolicy};

/// Pipeline stages, in execution order. Stage names appear verbatim in
/// `processing_traces.stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Received,
    ConnectionResolved,
    SessionAcquired,
    ConversationUpserted,
    UserMessageSaved,
    BindingResolved,
    AiCalled,
    ContextExtracted,
    AssistantMessageSaved,
    ReplySend,
    ResponseSent,
}

/// What processing one event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Terminal success; `warning` is set when the reply could not be
    /// delivered.
    Completed { warning: Option<String> },
    /// Transient failure: the drainer re-queues or dead-letters depending
    /// on the event's remaining claim budget.
    Transient { stage: Stage, error: String },
    /// Permanent failure: the event is parked as failed, with a dead
    /// letter when the AI call itself was the culprit.
    Permanent {
        stage: Stage,
        error: String,
        dead_letter: bool,
    },
}

struct StageFailure {
    stage: Stage,
    error: PontisError,
    transient: bool,
    dead_letter: bool,
}

impl StageFailure {
    fn from_error(stage: Stage, error: PontisError) -> Self {
        let transient = is_transient(&error);
        StageFailure {
            stage,
            error,
            transient,
            dead_letter: false,
        }
    }
}

/// Per-event pipeline executor. One instance serves the whole process;
/// all mutable state lives in the data service.
pub struct Worker {
    db: Database,
    runtime: RuntimeClient,
    graph: GraphClient,
    default_api_key: String,
    session_ttl_days: i64,
    history_limit: usize,
    ai_retry: RetryPolicy,
    send_retry: RetryPolicy,
    rng: Mutex<StdRng>,
}

impl Worker {
    pub fn new(
        db: Database,
        runtime: RuntimeClient,
        graph: GraphClient,
        default_api_key: String,
        session_ttl_days: i64,
        history_limit: usize,
    ) -> Self {
        Self {
            db,
            runtime,
            graph,
            default_api_key,
            session_ttl_days,
            history_limit,
            ai_retry: RetryPolicy::default(),
            send_retry: RetryPolicy::default(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Pin the jitter RNG and shrink backoff delays, for tests.
    pub fn with_retry_policies(mut self, ai: RetryPolicy, send: RetryPolicy, seed: u64) -> Self {
        self.ai_retry = ai;
        self.send_retry = send;
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Run the pipeline for one claimed event.
    pub async fn process_event(&self, event: &QueuedEvent) -> PipelineOutcome {
        match self.run_stages(event).await {
            Ok(warning) => {
                info!(event_id = %event.id, warning = ?warning, "event completed");
                PipelineOutcome::Completed { warning }
            }
            Err(failure) => {
                let error = format!("{}: {}", failure.stage, failure.error);
                warn!(event_id = %event.id, stage = %failure.stage, error = %failure.error,
                      transient = failure.transient, "pipeline stage failed");
                let detail = failure.error.to_string();
                let _ = traces::append(
                    &self.db,
                    &event.id,
                    &failure.stage.to_string(),
                    "failed",
                    Some(detail.as_str()),
                    None,
                )
                .await;
                if failure.transient {
                    PipelineOutcome::Transient {
                        stage: failure.stage,
                        error,
                    }
                } else {
                    PipelineOutcome::Permanent {
                        stage: failure.stage,
                        error,
                        dead_letter: failure.dead_letter,
                    }
                }
            }
        }
    }

    async fn run_stages(&self, event: &QueuedEvent) -> Result<Option<String>, StageFailure> {
        let platform = Platform::from_str(&event.platform).map_err(|_| {
            StageFailure::from_error(
                Stage::ConnectionResolved,
                PontisError::Internal(format!("unknown platform `{}`", event.platform)),
            )
        })?;

        // 1. Resolve the connection acting as the event's recipient asset.
        let connection =
            connections::find_by_asset(&self.db, &event.tenant_id, &event.platform, &event.recipient_id)
                .await
                .map_err(|e| StageFailure::from_error(Stage::ConnectionResolved, e))?
                .ok_or_else(|| {
                    StageFailure::from_error(
                        Stage::ConnectionResolved,
                        PontisError::MissingConnection {
                            tenant_id: event.tenant_id.clone(),
                            platform: event.platform.clone(),
                            asset_id: event.recipient_id.clone(),
                        },
                    )
                })?;
        self.trace_ok(event, Stage::ConnectionResolved).await?;

        // 2. Acquire the participant's session, extending its lease.
        let session = sessions::get_or_create(
            &self.db,
            &event.tenant_id,
            &event.sender_id,
            &event.platform,
            self.session_ttl_days,
        )
        .await
        .map_err(|e| StageFailure::from_error(Stage::SessionAcquired, e))?;
        self.trace_ok(event, Stage::SessionAcquired).await?;

        // 3. Upsert the conversation thread and bind the session.
        let conversation = conversations::upsert(
            &self.db,
            &event.tenant_id,
            &event.platform,
            &event.sender_id,
            &event.sender_id,
            &now_iso(),
            &session.id,
        )
        .await
        .map_err(|e| StageFailure::from_error(Stage::ConversationUpserted, e))?;
        self.trace_ok(event, Stage::ConversationUpserted).await?;

        // 4. Normalize and persist the user message.
        let raw: Value = serde_json::from_str(&event.raw_payload).map_err(|e| {
            StageFailure::from_error(
                Stage::UserMessageSaved,
                PontisError::MalformedPayload(format!("queued payload is not JSON: {e}")),
            )
        })?;
        // The normalizer is pure, so re-normalizing the stored payload here
        // matches what the gateway saw at ingestion time.
        let normalized = pontis_webhook::normalize(platform, &raw);
        let external_id = provider_message_id(platform, &raw);
        let user_ts = now_iso();
        messages::insert_message(
            &self.db,
            &MessageRow {
                id: uuid::Uuid::new_v4().to_string(),
                conversation_id: conversation.id.clone(),
                sender: "user".to_string(),
                content: normalized.text.clone(),
                external_id,
                sent_at: user_ts.clone(),
            },
        )
        .await
        .map_err(|e| StageFailure::from_error(Stage::UserMessageSaved, e))?;

        // 5. Append the user turn to the session history.
        sessions::append_history(
            &self.db,
            &session.id,
            "user",
            &normalized.text,
            &user_ts,
            self.history_limit,
        )
        .await
        .map_err(|e| StageFailure::from_error(Stage::UserMessageSaved, e))?;
        self.trace_ok(event, Stage::UserMessageSaved).await?;

        // 6. Resolve the AI binding; per-tenant key overrides the default.
        let binding = bindings::find_by_tenant(&self.db, &event.tenant_id)
            .await
            .map_err(|e| StageFailure::from_error(Stage::BindingResolved, e))?
            .ok_or_else(|| {
                StageFailure::from_error(
                    Stage::BindingResolved,
                    PontisError::MissingBinding(event.tenant_id.clone()),
                )
            })?;
        let api_key = binding
            .api_key
            .clone()
            .unwrap_or_else(|| self.default_api_key.clone());
        self.trace_ok(event, Stage::BindingResolved).await?;

        // 7. Call the AI runtime under the retry policy, with a failed
        // trace per attempt.
        let variables = sessions::get_session(&self.db, &session.id)
            .await
            .map_err(|e| StageFailure::from_error(Stage::AiCalled, e))?
            .map(|s| pontis_core::SessionContext::from_json(&s.context).flatten_variables())
            .unwrap_or_default();

        let records = {
            let mut rng = self.rng.lock().await;
            run_with_retry(&self.ai_retry, is_transient, &mut *rng, |attempt| {
                let runtime = self.runtime.clone();
                let db = self.db.clone();
                let event_id = event.id.clone();
                let tenant_id = event.tenant_id.clone();
                let api_key = api_key.clone();
                let text = normalized.text.clone();
                let variables = variables.clone();
                async move {
                    match runtime.interact(&tenant_id, &api_key, &text, &variables).await {
                        Ok(records) => Ok(records),
                        Err(e) => {
                            let detail = e.to_string();
                            let metadata = format!(r#"{{"attempt":{attempt}}}"#);
                            let _ = traces::append(
                                &db,
                                &event_id,
                                &Stage::AiCalled.to_string(),
                                "failed",
                                Some(detail.as_str()),
                                Some(metadata.as_str()),
                            )
                            .await;
                            Err(e)
                        }
                    }
                }
            })
            .await
        }
        .map_err(|retry_err| StageFailure {
            stage: Stage::AiCalled,
            transient: retry_err.transient,
            // A permanent runtime rejection is parked for inspection.
            dead_letter: !retry_err.transient,
            error: retry_err.error,
        })?;
        let ai_metadata = format!(r#"{{"records":{}}}"#, records.len());
        traces::append(
            &self.db,
            &event.id,
            &Stage::AiCalled.to_string(),
            "completed",
            None,
            Some(ai_metadata.as_str()),
        )
        .await
        .map_err(|e| StageFailure::from_error(Stage::AiCalled, e))?;

        // 8. Extract context updates and merge them into the session.
        let updates = extract_context_updates(records);
        if !updates.variables.is_empty() {
            sessions::merge_variables(&self.db, &session.id, &updates.variables, &now_iso())
                .await
                .map_err(|e| StageFailure::from_error(Stage::ContextExtracted, e))?;
        }
        self.trace_ok(event, Stage::ContextExtracted).await?;

        // 9/10. Collapse the reply; nothing sendable still completes.
        let Some(reply) = format_reply(&updates.records) else {
            debug!(event_id = %event.id, "runtime produced no sendable reply");
            traces::append(
                &self.db,
                &event.id,
                &Stage::ResponseSent.to_string(),
                "completed",
                None,
                Some(r#"{"skipped":"empty_reply"}"#),
            )
            .await
            .map_err(|e| StageFailure::from_error(Stage::ResponseSent, e))?;
            return Ok(None);
        };

        let assistant_ts = now_iso();
        messages::insert_message(
            &self.db,
            &MessageRow {
                id: uuid::Uuid::new_v4().to_string(),
                conversation_id: conversation.id.clone(),
                sender: "assistant".to_string(),
                content: reply.text.clone(),
                external_id: None,
                sent_at: assistant_ts.clone(),
            },
        )
        .await
        .map_err(|e| StageFailure::from_error(Stage::AssistantMessageSaved, e))?;
        sessions::append_history(
            &self.db,
            &session.id,
            "assistant",
            &reply.text,
            &assistant_ts,
            self.history_limit,
        )
        .await
        .map_err(|e| StageFailure::from_error(Stage::AssistantMessageSaved, e))?;
        self.trace_ok(event, Stage::AssistantMessageSaved).await?;

        // 11. Deliver through the provider. Failure here is a warning, not
        // an event failure: the assistant message is already durable.
        let send_result = {
            let mut rng = self.rng.lock().await;
            run_with_retry(&self.send_retry, is_transient, &mut *rng, |_| {
                let graph = self.graph.clone();
                let connection = connection.clone();
                let reply = reply.clone();
                let recipient = event.sender_id.clone();
                async move {
                    graph
                        .send_reply(
                            platform,
                            connection.account_id.as_deref(),
                            &connection.access_token,
                            &recipient,
                            &reply,
                        )
                        .await
                }
            })
            .await
        };

        let warning = match send_result {
            Ok(message_id) => {
                traces::append(
                    &self.db,
                    &event.id,
                    &Stage::ReplySend.to_string(),
                    "completed",
                    None,
                    message_id
                        .map(|id| format!(r#"{{"message_id":"{id}"}}"#))
                        .as_deref(),
                )
                .await
                .map_err(|e| StageFailure::from_error(Stage::ReplySend, e))?;
                None
            }
            Err(retry_err) => {
                warn!(event_id = %event.id, error = %retry_err.error,
                      attempts = retry_err.attempts, "reply undelivered after retries");
                let detail = retry_err.error.to_string();
                let metadata = format!(r#"{{"attempts":{}}}"#, retry_err.attempts);
                let _ = traces::append(
                    &self.db,
                    &event.id,
                    &Stage::ReplySend.to_string(),
                    "failed",
                    Some(detail.as_str()),
                    Some(metadata.as_str()),
                )
                .await;
                Some("undelivered".to_string())
            }
        };

        // 12. Finalize.
        traces::append(
            &self.db,
            &event.id,
            &Stage::ResponseSent.to_string(),
            "completed",
            None,
            warning
                .as_deref()
                .map(|w| format!(r#"{{"warning":"{w}"}}"#))
                .as_deref(),
        )
        .await
        .map_err(|e| StageFailure::from_error(Stage::ResponseSent, e))?;

        Ok(warning)
    }

    async fn trace_ok(&self, event: &QueuedEvent, stage: Stage) -> Result<(), StageFailure> {
        traces::append(&self.db, &event.id, &stage.to_string(), "completed", None, None)
            .await
            .map_err(|e| StageFailure::from_error(stage, e))
    }
}

/// Provider message id, per variant.
fn provider_message_id(platform: Platform, raw: &Value) -> Option<String> {
    let pointer = match platform {
        Platform::Page => "/message/mid",
        Platform::Photo => "/messages/0/id",
    };
    raw.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}
