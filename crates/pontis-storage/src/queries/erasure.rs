// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider-initiated data erasure.
//!
//! The erasure callback identifies a provider-side participant, not a
//! tenant: everything the bridge holds about that participant is removed
//! in one transaction, across all tenants.

use pontis_core::PontisError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};

/// Rows removed by an erasure pass, per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErasureReport {
    pub sessions: usize,
    pub conversations: usize,
    pub messages: usize,
    pub queued_events: usize,
}

impl ErasureReport {
    pub fn total(&self) -> usize {
        self.sessions + self.conversations + self.messages + self.queued_events
    }
}

/// Remove all rows belonging to a participant. Message rows go first via
/// their conversations; queue rows are matched on `sender_id`.
pub async fn erase_participant(
    db: &Database,
    participant_id: &str,
) -> Result<ErasureReport, PontisError> {
    let participant_id = participant_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let messages = tx.execute(
                "DELETE FROM messages WHERE conversation_id IN
                     (SELECT id FROM conversations WHERE participant_id = ?1)",
                params![participant_id],
            )?;
            let conversations = tx.execute(
                "DELETE FROM conversations WHERE participant_id = ?1",
                params![participant_id],
            )?;
            let sessions = tx.execute(
                "DELETE FROM sessions WHERE participant_id = ?1",
                params![participant_id],
            )?;
            let queued_events = tx.execute(
                "DELETE FROM queued_events WHERE sender_id = ?1",
                params![participant_id],
            )?;

            tx.commit()?;
            Ok(ErasureReport {
                sessions,
                conversations,
                messages,
                queued_events,
            })
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageRow;
    use crate::queries::{conversations, messages, queue, sessions, tenants};
    use tempfile::tempdir;

    #[tokio::test]
    async fn erasure_removes_participant_rows_only() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("er.db").to_str().unwrap())
            .await
            .unwrap();
        tenants::insert_tenant(&db, "t1", "op@example.com", "customer")
            .await
            .unwrap();

        for participant in ["victim", "other"] {
            let session = sessions::get_or_create(&db, "t1", participant, "page", 365)
                .await
                .unwrap();
            let conversation = conversations::upsert(
                &db,
                "t1",
                "page",
                participant,
                participant,
                "2026-01-01T00:00:00.000Z",
                &session.id,
            )
            .await
            .unwrap();
            messages::insert_message(
                &db,
                &MessageRow {
                    id: format!("m-{participant}"),
                    conversation_id: conversation.id.clone(),
                    sender: "user".to_string(),
                    content: "hello".to_string(),
                    external_id: None,
                    sent_at: "2026-01-01T00:00:01.000Z".to_string(),
                },
            )
            .await
            .unwrap();
            queue::enqueue_event(
                &db,
                &queue::NewQueuedEvent {
                    id: format!("e-{participant}"),
                    tenant_id: "t1".to_string(),
                    platform: "page".to_string(),
                    sender_id: participant.to_string(),
                    recipient_id: "page-9".to_string(),
                    raw_payload: "{}".to_string(),
                    event_ts: "2026-01-01T00:00:00.000Z".to_string(),
                },
            )
            .await
            .unwrap();
        }

        let report = erase_participant(&db, "victim").await.unwrap();
        assert_eq!(
            report,
            ErasureReport {
                sessions: 1,
                conversations: 1,
                messages: 1,
                queued_events: 1,
            }
        );

        // The other participant is untouched.
        assert!(queue::get_event(&db, "e-other").await.unwrap().is_some());
        assert!(queue::get_event(&db, "e-victim").await.unwrap().is_none());
    }
}
