// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant rows. Creation happens in the out-of-scope admin surface; the
//! bridge only reads them and soft-deletes on erasure requests.

use pontis_core::PontisError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::Tenant;

/// Insert a tenant row (admin surface / test fixtures).
pub async fn insert_tenant(
    db: &Database,
    id: &str,
    email: &str,
    role: &str,
) -> Result<(), PontisError> {
    let id = id.to_string();
    let email = email.to_string();
    let role = role.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenants (id, email, role) VALUES (?1, ?2, ?3)",
                params![id, email, role],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a tenant that has not been soft-deleted.
pub async fn get_active_tenant(db: &Database, id: &str) -> Result<Option<Tenant>, PontisError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, role, created_at, deleted_at
                 FROM tenants WHERE id = ?1 AND deleted_at IS NULL",
            )?;
            match stmt.query_row(params![id], |row| {
                Ok(Tenant {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    role: row.get(2)?,
                    created_at: row.get(3)?,
                    deleted_at: row.get(4)?,
                })
            }) {
                Ok(tenant) => Ok(Some(tenant)),
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

    #[tokio::test]
    async fn insert_and_get_tenant() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();

        insert_tenant(&db, "t1", "op@example.com", "customer")
            .await
            .unwrap();
        let tenant = get_active_tenant(&db, "t1").await.unwrap().unwrap();
        assert_eq!(tenant.email, "op@example.com");
        assert_eq!(tenant.role, "customer");
        assert!(get_active_tenant(&db, "missing").await.unwrap().is_none());
    }
}
