// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store operations.
//!
//! The lookup key is `(tenant_id, participant_id, platform)`; the most
//! recent matching row wins and a fresh row is created on miss. Context
//! mutations are read-modify-write inside a single writer-thread closure,
//! so concurrent appends on the same session both land.

use pontis_core::{PontisError, SessionContext};
use rusqlite::params;
use serde_json::{Map, Value};

use crate::database::{map_tr_err, Database};
use crate::models::Session;

const SESSION_COLUMNS: &str =
    "id, tenant_id, participant_id, platform, context, last_interaction, expires_at";

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<Session, rusqlite::Error> {
    Ok(Session {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        participant_id: row.get(2)?,
        platform: row.get(3)?,
        context: row.get(4)?,
        last_interaction: row.get(5)?,
        expires_at: row.get(6)?,
    })
}

/// Find the most recent session for the key, or create one with a fresh
/// TTL. Either way the returned session has `last_interaction` = now and
/// `expires_at` = now + `ttl_days` (every interaction extends the lease).
pub async fn get_or_create(
    db: &Database,
    tenant_id: &str,
    participant_id: &str,
    platform: &str,
    ttl_days: i64,
) -> Result<Session, PontisError> {
    let tenant_id = tenant_id.to_string();
    let participant_id = participant_id.to_string();
    let platform = platform.to_string();
    let new_id = uuid::Uuid::new_v4().to_string();

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now: String = tx.query_row(
                "SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
                |row| row.get(0),
            )?;
            let ttl_modifier = format!("+{ttl_days} days");
            let expires_at: String = tx.query_row(
                "SELECT strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)",
                params![ttl_modifier],
                |row| row.get(0),
            )?;

            let existing = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE tenant_id = ?1 AND participant_id = ?2 AND platform = ?3
                     ORDER BY last_interaction DESC
                     LIMIT 1"
                ))?;
                match stmt.query_row(params![tenant_id, participant_id, platform], row_to_session)
                {
                    Ok(session) => Some(session),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };

            let session = match existing {
                Some(mut session) => {
                    tx.execute(
                        "UPDATE sessions SET last_interaction = ?1, expires_at = ?2 WHERE id = ?3",
                        params![now, expires_at, session.id],
                    )?;
                    session.last_interaction = now;
                    session.expires_at = expires_at;
                    session
                }
                None => {
                    tx.execute(
                        "INSERT INTO sessions (id, tenant_id, participant_id, platform, context,
                             last_interaction, expires_at)
                         VALUES (?1, ?2, ?3, ?4, '{}', ?5, ?6)",
                        params![new_id, tenant_id, participant_id, platform, now, expires_at],
                    )?;
                    Session {
                        id: new_id,
                        tenant_id,
                        participant_id,
                        platform,
                        context: "{}".to_string(),
                        last_interaction: now,
                        expires_at,
                    }
                }
            };
            tx.commit()?;
            Ok(session)
        })
        .await
        .map_err(map_tr_err)
}

/// Append one dialog turn to the session's `conversationHistory`,
/// truncating to the newest `limit` entries. Read-modify-write in a single
/// writer-thread closure.
pub async fn append_history(
    db: &Database,
    session_id: &str,
    role: &str,
    content: &str,
    ts: &str,
    limit: usize,
) -> Result<(), PontisError> {
    let session_id = session_id.to_string();
    let role = role.to_string();
    let content = content.to_string();
    let ts = ts.to_string();

    db.connection()
        .call(move |conn| {
            let raw: String = conn.query_row(
                "SELECT context FROM sessions WHERE id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            let mut context = SessionContext::from_json(&raw);
            context.push_history(&role, &content, &ts, limit);
            conn.execute(
                "UPDATE sessions SET context = ?1 WHERE id = ?2",
                params![context.to_json(), session_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Merge scalar variables into the session context root map.
pub async fn merge_variables(
    db: &Database,
    session_id: &str,
    vars: &Map<String, Value>,
    now: &str,
) -> Result<(), PontisError> {
    let session_id = session_id.to_string();
    let vars = vars.clone();
    let now = now.to_string();

    db.connection()
        .call(move |conn| {
            let raw: String = conn.query_row(
                "SELECT context FROM sessions WHERE id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            let mut context = SessionContext::from_json(&raw);
            context.merge_scalars(&vars, &now);
            conn.execute(
                "UPDATE sessions SET context = ?1 WHERE id = ?2",
                params![context.to_json(), session_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete sessions whose lease has lapsed. Returns how many were removed.
pub async fn delete_expired(db: &Database) -> Result<usize, PontisError> {
    db.connection()
        .call(|conn| {
            let deleted = conn.execute(
                "DELETE FROM sessions
                 WHERE expires_at < strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [],
            )?;
            Ok(deleted)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a single session.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<Session>, PontisError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_session) {
                Ok(session) => Ok(Some(session)),
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
    use crate::queries::tenants;
    use pontis_core::context::HISTORY_LIMIT;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        tenants::insert_tenant(&db, "t1", "op@example.com", "customer")
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn get_or_create_creates_then_reuses() {
        let (db, _dir) = setup_db().await;

        let first = get_or_create(&db, "t1", "p1", "page", 365).await.unwrap();
        assert_eq!(first.context, "{}");
        assert!(first.expires_at > first.last_interaction);

        let second = get_or_create(&db, "t1", "p1", "page", 365).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.last_interaction >= first.last_interaction);

        // Different platform gets its own session.
        let other = get_or_create(&db, "t1", "p1", "photo", 365).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn interactions_extend_the_lease() {
        let (db, _dir) = setup_db().await;
        let session = get_or_create(&db, "t1", "p1", "page", 30).await.unwrap();
        let extended = get_or_create(&db, "t1", "p1", "page", 30).await.unwrap();
        assert_eq!(session.id, extended.id);
        assert!(extended.expires_at >= session.expires_at);
        assert!(extended.expires_at > extended.last_interaction);
    }

    #[tokio::test]
    async fn history_appends_and_caps_at_limit() {
        let (db, _dir) = setup_db().await;
        let session = get_or_create(&db, "t1", "p1", "page", 365).await.unwrap();

        for i in 0..51 {
            append_history(
                &db,
                &session.id,
                "user",
                &format!("msg {i}"),
                &format!("2026-01-01T00:00:00.{i:03}Z"),
                HISTORY_LIMIT,
            )
            .await
            .unwrap();
        }

        let stored = get_session(&db, &session.id).await.unwrap().unwrap();
        let context = SessionContext::from_json(&stored.context);
        let history = context.history();
        assert_eq!(history.len(), 50);
        assert_eq!(history[0].content, "msg 1");
        assert_eq!(history[49].content, "msg 50");
    }

    #[tokio::test]
    async fn concurrent_appends_both_land() {
        let (db, _dir) = setup_db().await;
        let session = get_or_create(&db, "t1", "p1", "page", 365).await.unwrap();

        let a = {
            let db = db.clone();
            let id = session.id.clone();
            tokio::spawn(async move {
                append_history(&db, &id, "user", "first", "2026-01-01T00:00:01.000Z", 50).await
            })
        };
        let b = {
            let db = db.clone();
            let id = session.id.clone();
            tokio::spawn(async move {
                append_history(&db, &id, "user", "second", "2026-01-01T00:00:02.000Z", 50).await
            })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let stored = get_session(&db, &session.id).await.unwrap().unwrap();
        let history = SessionContext::from_json(&stored.context).history();
        assert_eq!(history.len(), 2, "no append may be lost");
    }

    #[tokio::test]
    async fn merge_variables_updates_root_map() {
        let (db, _dir) = setup_db().await;
        let session = get_or_create(&db, "t1", "p1", "page", 365).await.unwrap();

        let mut vars = Map::new();
        vars.insert("plan".into(), Value::String("pro".into()));
        merge_variables(&db, &session.id, &vars, "2026-01-01T00:00:01.000Z")
            .await
            .unwrap();

        let stored = get_session(&db, &session.id).await.unwrap().unwrap();
        let context = SessionContext::from_json(&stored.context);
        assert_eq!(context.0.get("plan"), Some(&Value::String("pro".into())));
        assert_eq!(
            context.0.get("lastUpdated"),
            Some(&Value::String("2026-01-01T00:00:01.000Z".into()))
        );
    }

    #[tokio::test]
    async fn sweep_deletes_only_lapsed_sessions() {
        let (db, _dir) = setup_db().await;
        let live = get_or_create(&db, "t1", "p1", "page", 365).await.unwrap();
        let lapsed = get_or_create(&db, "t1", "p2", "page", 365).await.unwrap();

        let lapsed_id = lapsed.id.clone();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE sessions SET expires_at = '2020-01-01T00:00:00.000Z' WHERE id = ?1",
                    params![lapsed_id],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let cleaned = delete_expired(&db).await.unwrap();
        assert_eq!(cleaned, 1);
        assert!(get_session(&db, &live.id).await.unwrap().is_some());
        assert!(get_session(&db, &lapsed.id).await.unwrap().is_none());
    }
}
