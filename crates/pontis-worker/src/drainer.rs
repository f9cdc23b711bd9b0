// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue drainer: claims a batch and runs each event through the pipeline.
//!
//! Events are processed sequentially in claim order, which serializes the
//! messages of any one conversation (the claim query is oldest-first).
//! Before claiming, abandoned `processing` rows are reaped back to
//! `pending`.

use pontis_core::time::now_iso;
use pontis_core::PontisError;
use pontis_storage::models::{DeadLetter, QueuedEvent};
use pontis_storage::queries::{dead_letters, queue};
use tracing::{info, warn};

use crate::pipeline::{PipelineOutcome, Worker};

/// Per-event drain result, reported to the caller of `/api/drain`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct EventResult {
    pub event_id: String,
    /// "completed", "requeued", or "failed".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// One drain pass's work.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DrainReport {
    pub processed: usize,
    pub results: Vec<EventResult>,
}

/// Run one drain pass: reap stale claims, claim up to `batch_size` events,
/// process each, and apply the queue transition its outcome demands.
pub async fn drain(
    worker: &Worker,
    batch_size: u32,
    max_retries: u32,
    stale_after_secs: u64,
) -> Result<DrainReport, PontisError> {
    let db = worker.database();

    let reaped = queue::reap_stale(db, stale_after_secs).await?;
    if reaped > 0 {
        warn!(reaped, "reverted stale processing claims");
    }

    let claimed = queue::claim_batch(db, batch_size, max_retries).await?;
    let mut results = Vec::with_capacity(claimed.len());

    for event in &claimed {
        let outcome = worker.process_event(event).await;
        let result = apply_outcome(worker, event, outcome, max_retries).await?;
        results.push(result);
    }

    info!(processed = results.len(), "drain pass finished");
    Ok(DrainReport {
        processed: results.len(),
        results,
    })
}

async fn apply_outcome(
    worker: &Worker,
    event: &QueuedEvent,
    outcome: PipelineOutcome,
    max_retries: u32,
) -> Result<EventResult, PontisError> {
    let db = worker.database();
    match outcome {
        PipelineOutcome::Completed { warning } => {
            queue::mark_completed(db, &event.id).await?;
            Ok(EventResult {
                event_id: event.id.clone(),
                status: "completed".to_string(),
                detail: warning,
            })
        }
        PipelineOutcome::Transient { stage, error } => {
            if event.retry_count >= i64::from(max_retries) {
                // Claim budget spent: park the event and its payload.
                queue::mark_failed(db, &event.id, &error).await?;
                park(worker, event, &stage.to_string(), &error).await?;
                Ok(EventResult {
                    event_id: event.id.clone(),
                    status: "failed".to_string(),
                    detail: Some(error),
                })
            } else {
                queue::release_to_pending(db, &event.id, &error).await?;
                Ok(EventResult {
                    event_id: event.id.clone(),
                    status: "requeued".to_string(),
                    detail: Some(error),
                })
            }
        }
        PipelineOutcome::Permanent {
            stage,
            error,
            dead_letter,
        } => {
            queue::mark_failed(db, &event.id, &error).await?;
            if dead_letter {
                park(worker, event, &stage.to_string(), &error).await?;
            }
            Ok(EventResult {
                event_id: event.id.clone(),
                status: "failed".to_string(),
                detail: Some(error),
            })
        }
    }
}

async fn park(
    worker: &Worker,
    event: &QueuedEvent,
    stage: &str,
    error: &str,
) -> Result<(), PontisError> {
    let metadata = serde_json::json!({
        "stage": stage,
        "queued_event_id": event.id,
        "retry_count": event.retry_count,
    });
    dead_letters::insert_dead_letter(
        worker.database(),
        &DeadLetter {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: event.tenant_id.clone(),
            original_payload: event.raw_payload.clone(),
            error: error.to_string(),
            metadata: Some(metadata.to_string()),
            failed_at: now_iso(),
            status: "failed".to_string(),
            retry_count: 0,
        },
    )
    .await
}
