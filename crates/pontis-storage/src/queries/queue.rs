// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion queue operations.
//!
//! State machine: `pending → processing → completed | failed`, with
//! transient failures released back to `pending` until the claim budget is
//! spent. A `failed` row is only re-claimable through the explicit operator
//! [`requeue_failed`] action.

use pontis_core::PontisError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::QueuedEvent;

/// Fields for a freshly received event.
#[derive(Debug, Clone)]
pub struct NewQueuedEvent {
    pub id: String,
    pub tenant_id: String,
    pub platform: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub raw_payload: String,
    pub event_ts: String,
}

const EVENT_COLUMNS: &str = "id, tenant_id, platform, sender_id, recipient_id, raw_payload,
             event_ts, status, retry_count, last_retry_at, error, completed_at, created_at";

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<QueuedEvent, rusqlite::Error> {
    Ok(QueuedEvent {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        platform: row.get(2)?,
        sender_id: row.get(3)?,
        recipient_id: row.get(4)?,
        raw_payload: row.get(5)?,
        event_ts: row.get(6)?,
        status: row.get(7)?,
        retry_count: row.get(8)?,
        last_retry_at: row.get(9)?,
        error: row.get(10)?,
        completed_at: row.get(11)?,
        created_at: row.get(12)?,
    })
}

/// Durably record an inbound event.
///
/// Inserts the `pending` queue row and its `received` trace in a single
/// transaction, so an acknowledged webhook always has both or neither.
pub async fn enqueue_event(db: &Database, event: &NewQueuedEvent) -> Result<(), PontisError> {
    let event = event.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO queued_events (id, tenant_id, platform, sender_id, recipient_id,
                     raw_payload, event_ts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    event.id,
                    event.tenant_id,
                    event.platform,
                    event.sender_id,
                    event.recipient_id,
                    event.raw_payload,
                    event.event_ts,
                ],
            )?;
            tx.execute(
                "INSERT INTO processing_traces (queued_event_id, stage, status)
                 VALUES (?1, 'received', 'completed')",
                params![event.id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim up to `limit` pending events.
///
/// Each claimed row moves to `processing` with `retry_count + 1` and a fresh
/// `last_retry_at`. Rows that have spent their claim budget are skipped.
/// Selection is oldest-first so one conversation's events drain in enqueue
/// order.
pub async fn claim_batch(
    db: &Database,
    limit: u32,
    max_retries: u32,
) -> Result<Vec<QueuedEvent>, PontisError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now: String = tx.query_row(
                "SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
                |row| row.get(0),
            )?;

            let mut claimed = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {EVENT_COLUMNS}
                     FROM queued_events
                     WHERE status = 'pending' AND retry_count < ?1
                     ORDER BY created_at ASC, rowid ASC
                     LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![max_retries, limit], row_to_event)?;
                let mut events = Vec::new();
                for row in rows {
                    events.push(row?);
                }
                events
            };

            for event in &mut claimed {
                // Conditional update: only a still-pending row is claimed.
                tx.execute(
                    "UPDATE queued_events
                     SET status = 'processing', retry_count = retry_count + 1,
                         last_retry_at = ?1
                     WHERE id = ?2 AND status = 'pending'",
                    params![now, event.id],
                )?;
                event.status = "processing".to_string();
                event.retry_count += 1;
                event.last_retry_at = Some(now.clone());
            }
            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(map_tr_err)
}

/// Terminal success: `processing → completed`.
pub async fn mark_completed(db: &Database, id: &str) -> Result<(), PontisError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queued_events
                 SET status = 'completed', error = NULL,
                     completed_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Terminal failure: `processing → failed`.
pub async fn mark_failed(db: &Database, id: &str, error: &str) -> Result<(), PontisError> {
    let id = id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queued_events SET status = 'failed', error = ?1 WHERE id = ?2",
                params![error, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Transient failure with claim budget remaining: release back to `pending`
/// for a later drain pass. The retry counter keeps its claim increment.
pub async fn release_to_pending(db: &Database, id: &str, error: &str) -> Result<(), PontisError> {
    let id = id.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queued_events SET status = 'pending', error = ?1 WHERE id = ?2",
                params![error, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Operator action: make a `failed` event claimable again with a fresh
/// retry budget. Returns false when the row is absent or not failed.
pub async fn requeue_failed(db: &Database, id: &str) -> Result<bool, PontisError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE queued_events
                 SET status = 'pending', retry_count = 0, error = NULL
                 WHERE id = ?1 AND status = 'failed'",
                params![id],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Reverts abandoned claims: `processing` rows whose `last_retry_at` is
/// older than `stale_secs` go back to `pending`. Returns how many rows
/// were reaped.
pub async fn reap_stale(db: &Database, stale_secs: u64) -> Result<usize, PontisError> {
    let modifier = format!("-{stale_secs} seconds");
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE queued_events
                 SET status = 'pending'
                 WHERE status = 'processing'
                   AND last_retry_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)",
                params![modifier],
            )?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a single event.
pub async fn get_event(db: &Database, id: &str) -> Result<Option<QueuedEvent>, PontisError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {EVENT_COLUMNS} FROM queued_events WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_event) {
                Ok(event) => Ok(Some(event)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_event(id: &str) -> NewQueuedEvent {
        NewQueuedEvent {
            id: id.to_string(),
            tenant_id: "t1".to_string(),
            platform: "page".to_string(),
            sender_id: "participant-1".to_string(),
            recipient_id: "page-9".to_string(),
            raw_payload: r#"{"message":{"text":"hello"}}"#.to_string(),
            event_ts: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn enqueue_writes_event_and_received_trace_atomically() {
        let (db, _dir) = setup_db().await;
        enqueue_event(&db, &make_event("e1")).await.unwrap();

        let event = get_event(&db, "e1").await.unwrap().unwrap();
        assert_eq!(event.status, "pending");
        assert_eq!(event.retry_count, 0);

        let traces: i64 = db
            .connection()
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM processing_traces
                     WHERE queued_event_id = 'e1' AND stage = 'received' AND status = 'completed'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(traces, 1);
    }

    #[tokio::test]
    async fn claim_marks_processing_and_increments_retry_count() {
        let (db, _dir) = setup_db().await;
        enqueue_event(&db, &make_event("e1")).await.unwrap();
        enqueue_event(&db, &make_event("e2")).await.unwrap();

        let claimed = claim_batch(&db, 5, 3).await.unwrap();
        assert_eq!(claimed.len(), 2);
        for event in &claimed {
            assert_eq!(event.status, "processing");
            assert_eq!(event.retry_count, 1);
            assert!(event.last_retry_at.is_some());
        }

        // Nothing left to claim.
        let empty = claim_batch(&db, 5, 3).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn claim_respects_batch_limit_and_oldest_first() {
        let (db, _dir) = setup_db().await;
        for i in 0..4 {
            let mut event = make_event(&format!("e{i}"));
            // Distinct created_at values so ordering is deterministic.
            event.event_ts = format!("2026-01-01T00:00:0{i}.000Z");
            enqueue_event(&db, &event).await.unwrap();
            let id = event.id.clone();
            db.connection()
                .call(move |conn| {
                    conn.execute(
                        "UPDATE queued_events SET created_at = ?1 WHERE id = ?2",
                        params![format!("2026-01-01T00:00:0{i}.000Z"), id],
                    )?;
                    Ok(())
                })
                .await
                .unwrap();
        }

        let claimed = claim_batch(&db, 2, 3).await.unwrap();
        assert_eq!(claimed.len(), 2);
        assert_eq!(claimed[0].id, "e0");
        assert_eq!(claimed[1].id, "e1");
    }

    #[tokio::test]
    async fn released_event_is_claimable_until_budget_spent() {
        let (db, _dir) = setup_db().await;
        enqueue_event(&db, &make_event("e1")).await.unwrap();

        for attempt in 1..=3 {
            let claimed = claim_batch(&db, 5, 3).await.unwrap();
            assert_eq!(claimed.len(), 1, "attempt {attempt} should claim");
            assert_eq!(claimed[0].retry_count, attempt);
            release_to_pending(&db, "e1", "AI runtime 503").await.unwrap();
        }

        // Budget spent: pending but no longer claimable.
        let event = get_event(&db, "e1").await.unwrap().unwrap();
        assert_eq!(event.status, "pending");
        assert_eq!(event.retry_count, 3);
        let claimed = claim_batch(&db, 5, 3).await.unwrap();
        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn completed_event_is_never_reclaimed() {
        let (db, _dir) = setup_db().await;
        enqueue_event(&db, &make_event("e1")).await.unwrap();

        let claimed = claim_batch(&db, 5, 3).await.unwrap();
        assert_eq!(claimed.len(), 1);
        mark_completed(&db, "e1").await.unwrap();

        let event = get_event(&db, "e1").await.unwrap().unwrap();
        assert_eq!(event.status, "completed");
        assert!(event.completed_at.is_some());

        let claimed = claim_batch(&db, 5, 3).await.unwrap();
        assert!(claimed.is_empty());
    }

    #[tokio::test]
    async fn failed_event_requires_operator_requeue() {
        let (db, _dir) = setup_db().await;
        enqueue_event(&db, &make_event("e1")).await.unwrap();
        claim_batch(&db, 5, 3).await.unwrap();
        mark_failed(&db, "e1", "ai_call: upstream returned 401").await.unwrap();

        assert!(claim_batch(&db, 5, 3).await.unwrap().is_empty());

        assert!(requeue_failed(&db, "e1").await.unwrap());
        let event = get_event(&db, "e1").await.unwrap().unwrap();
        assert_eq!(event.status, "pending");
        assert_eq!(event.retry_count, 0);
        assert!(event.error.is_none());

        // A second requeue is a no-op.
        assert!(!requeue_failed(&db, "e1").await.unwrap());
    }

    #[tokio::test]
    async fn reap_stale_reverts_old_claims_only() {
        let (db, _dir) = setup_db().await;
        enqueue_event(&db, &make_event("stale")).await.unwrap();
        enqueue_event(&db, &make_event("fresh")).await.unwrap();
        claim_batch(&db, 5, 3).await.unwrap();

        // Age one claim beyond the stale window.
        db.connection()
            .call(|conn| {
                conn.execute(
                    "UPDATE queued_events
                     SET last_retry_at = '2020-01-01T00:00:00.000Z'
                     WHERE id = 'stale'",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let reaped = reap_stale(&db, 300).await.unwrap();
        assert_eq!(reaped, 1);
        assert_eq!(get_event(&db, "stale").await.unwrap().unwrap().status, "pending");
        assert_eq!(get_event(&db, "fresh").await.unwrap().unwrap().status, "processing");
    }
}
