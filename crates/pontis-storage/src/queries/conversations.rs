// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation threads.
//!
//! `last_message_at` is guarded to be monotone non-decreasing: a stale
//! touch (e.g. a redelivered event processed after a newer one) never
//! rewinds the thread clock.

use pontis_core::PontisError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::Conversation;

const CONVERSATION_COLUMNS: &str =
    "id, tenant_id, platform, external_thread_id, participant_id, last_message_at, session_id";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        platform: row.get(2)?,
        external_thread_id: row.get(3)?,
        participant_id: row.get(4)?,
        last_message_at: row.get(5)?,
        session_id: row.get(6)?,
    })
}

/// Find the thread for `(tenant, platform, external_thread_id)` or create
/// it, then advance `last_message_at` to `message_at` (monotone) and bind
/// the session. Returns the up-to-date row.
pub async fn upsert(
    db: &Database,
    tenant_id: &str,
    platform: &str,
    external_thread_id: &str,
    participant_id: &str,
    message_at: &str,
    session_id: &str,
) -> Result<Conversation, PontisError> {
    let tenant_id = tenant_id.to_string();
    let platform = platform.to_string();
    let external_thread_id = external_thread_id.to_string();
    let participant_id = participant_id.to_string();
    let message_at = message_at.to_string();
    let session_id = session_id.to_string();
    let new_id = uuid::Uuid::new_v4().to_string();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations (id, tenant_id, platform, external_thread_id,
                     participant_id, last_message_at, session_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (tenant_id, platform, external_thread_id) DO UPDATE SET
                     last_message_at = MAX(last_message_at, excluded.last_message_at),
                     session_id = excluded.session_id",
                params![
                    new_id,
                    tenant_id,
                    platform,
                    external_thread_id,
                    participant_id,
                    message_at,
                    session_id,
                ],
            )?;
            let conversation = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE tenant_id = ?1 AND platform = ?2 AND external_thread_id = ?3"
                ))?;
                stmt.query_row(
                    params![tenant_id, platform, external_thread_id],
                    row_to_conversation,
                )?
            };
            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a single conversation.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, PontisError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_conversation) {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}
