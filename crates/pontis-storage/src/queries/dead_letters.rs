// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dead letters: events parked after permanent failure or exhausted retries.

use pontis_core::PontisError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::DeadLetter;

/// Park a terminally-failed event.
pub async fn insert_dead_letter(db: &Database, letter: &DeadLetter) -> Result<(), PontisError> {
    let l = letter.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO dead_letters (id, tenant_id, original_payload, error, metadata,
                     failed_at, status, retry_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    l.id,
                    l.tenant_id,
                    l.original_payload,
                    l.error,
                    l.metadata,
                    l.failed_at,
                    l.status,
                    l.retry_count,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Most recent dead letters for a tenant, newest first.
pub async fn list_for_tenant(
    db: &Database,
    tenant_id: &str,
    limit: i64,
) -> Result<Vec<DeadLetter>, PontisError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, original_payload, error, metadata, failed_at,
                        status, retry_count
                 FROM dead_letters WHERE tenant_id = ?1
                 ORDER BY failed_at DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![tenant_id, limit], |row| {
                Ok(DeadLetter {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    original_payload: row.get(2)?,
                    error: row.get(3)?,
                    metadata: row.get(4)?,
                    failed_at: row.get(5)?,
                    status: row.get(6)?,
                    retry_count: row.get(7)?,
                })
            })?;
            let mut letters = Vec::new();
            for row in rows {
                letters.push(row?);
            }
            Ok(letters)
        })
        .await
        .map_err(map_tr_err)
}
