// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message rows within a conversation.

use pontis_core::PontisError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::MessageRow;

/// Insert a message.
pub async fn insert_message(db: &Database, msg: &MessageRow) -> Result<(), PontisError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, sender, content, external_id, sent_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.sender,
                    msg.content,
                    msg.external_id,
                    msg.sent_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Messages for a conversation in chronological order.
pub async fn list_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<MessageRow>, PontisError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, sender, content, external_id, sent_at
                 FROM messages WHERE conversation_id = ?1
                 ORDER BY sent_at ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                Ok(MessageRow {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    sender: row.get(2)?,
                    content: row.get(3)?,
                    external_id: row.get(4)?,
                    sent_at: row.get(5)?,
                })
            })?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}
