// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only processing traces, one row per pipeline stage outcome.

use pontis_core::PontisError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::ProcessingTrace;

/// Append a trace row.
pub async fn append(
    db: &Database,
    queued_event_id: &str,
    stage: &str,
    status: &str,
    error: Option<&str>,
    metadata: Option<&str>,
) -> Result<(), PontisError> {
    let queued_event_id = queued_event_id.to_string();
    let stage = stage.to_string();
    let status = status.to_string();
    let error = error.map(str::to_string);
    let metadata = metadata.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO processing_traces (queued_event_id, stage, status, error, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![queued_event_id, stage, status, error, metadata],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All traces for an event, in append order.
pub async fn list_for_event(
    db: &Database,
    queued_event_id: &str,
) -> Result<Vec<ProcessingTrace>, PontisError> {
    let queued_event_id = queued_event_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, queued_event_id, stage, status, error, metadata, created_at
                 FROM processing_traces WHERE queued_event_id = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![queued_event_id], |row| {
                Ok(ProcessingTrace {
                    id: row.get(0)?,
                    queued_event_id: row.get(1)?,
                    stage: row.get(2)?,
                    status: row.get(3)?,
                    error: row.get(4)?,
                    metadata: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?;
            let mut traces = Vec::new();
            for row in rows {
                traces.push(row?);
            }
            Ok(traces)
        })
        .await
        .map_err(map_tr_err)
}
