// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook endpoint registrations, consulted by the challenge responder.

use pontis_core::PontisError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::WebhookRegistration;

/// Insert a registration (admin surface / test fixtures).
pub async fn insert_registration(
    db: &Database,
    registration: &WebhookRegistration,
) -> Result<(), PontisError> {
    let r = registration.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO webhook_configs (id, tenant_id, platform, verification_token,
                     webhook_url, generated_url, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    r.id,
                    r.tenant_id,
                    r.platform,
                    r.verification_token,
                    r.webhook_url,
                    r.generated_url,
                    r.is_active,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Find the active registration for a tenant and platform. A registration
/// stored with platform `any` matches either variant.
pub async fn find_active(
    db: &Database,
    tenant_id: &str,
    platform: &str,
) -> Result<Option<WebhookRegistration>, PontisError> {
    let tenant_id = tenant_id.to_string();
    let platform = platform.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, platform, verification_token, webhook_url,
                        generated_url, is_active, created_at
                 FROM webhook_configs
                 WHERE tenant_id = ?1 AND platform IN (?2, 'any') AND is_active = 1
                 ORDER BY CASE platform WHEN ?2 THEN 0 ELSE 1 END
                 LIMIT 1",
            )?;
            match stmt.query_row(params![tenant_id, platform], |row| {
                Ok(WebhookRegistration {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    platform: row.get(2)?,
                    verification_token: row.get(3)?,
                    webhook_url: row.get(4)?,
                    generated_url: row.get(5)?,
                    is_active: row.get(6)?,
                    created_at: row.get(7)?,
                })
            }) {
                Ok(registration) => Ok(Some(registration)),
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
    use tempfile::tempdir;

    fn registration(id: &str, platform: &str, token: &str, active: bool) -> WebhookRegistration {
        WebhookRegistration {
            id: id.to_string(),
            tenant_id: "t1".to_string(),
            platform: platform.to_string(),
            verification_token: token.to_string(),
            webhook_url: None,
            generated_url: None,
            is_active: active,
            created_at: String::new(),
        }
    }

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("w.db").to_str().unwrap())
            .await
            .unwrap();
        tenants::insert_tenant(&db, "t1", "op@example.com", "customer")
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn find_active_prefers_exact_platform_over_any() {
        let (db, _dir) = setup_db().await;
        insert_registration(&db, &registration("w-any", "any", "tok-any", true))
            .await
            .unwrap();
        insert_registration(&db, &registration("w-page", "page", "tok-page", true))
            .await
            .unwrap();

        let found = find_active(&db, "t1", "page").await.unwrap().unwrap();
        assert_eq!(found.id, "w-page");

        // Photo has no exact registration; the `any` row matches.
        let found = find_active(&db, "t1", "photo").await.unwrap().unwrap();
        assert_eq!(found.id, "w-any");
    }

    #[tokio::test]
    async fn inactive_registrations_do_not_match() {
        let (db, _dir) = setup_db().await;
        insert_registration(&db, &registration("w1", "page", "tok", false))
            .await
            .unwrap();
        assert!(find_active(&db, "t1", "page").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_active_registration_is_rejected() {
        let (db, _dir) = setup_db().await;
        insert_registration(&db, &registration("w1", "page", "tok-a", true))
            .await
            .unwrap();
        // Second active row for the same (tenant, platform) violates the
        // partial unique index.
        assert!(insert_registration(&db, &registration("w2", "page", "tok-b", true))
            .await
            .is_err());
        // An inactive duplicate is fine.
        insert_registration(&db, &registration("w3", "page", "tok-c", false))
            .await
            .unwrap();
    }
}
