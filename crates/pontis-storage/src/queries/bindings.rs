// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI project bindings: per-tenant runtime project and credentials.

use pontis_core::PontisError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::AiBinding;

/// Insert a binding (admin surface / test fixtures). The schema allows at
/// most one per tenant.
pub async fn insert_binding(db: &Database, binding: &AiBinding) -> Result<(), PontisError> {
    let b = binding.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO ai_bindings (id, tenant_id, project_id, runtime_config, api_key)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![b.id, b.tenant_id, b.project_id, b.runtime_config, b.api_key],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The tenant's binding, if any.
pub async fn find_by_tenant(
    db: &Database,
    tenant_id: &str,
) -> Result<Option<AiBinding>, PontisError> {
    let tenant_id = tenant_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, project_id, runtime_config, api_key, created_at
                 FROM ai_bindings WHERE tenant_id = ?1",
            )?;
            match stmt.query_row(params![tenant_id], |row| {
                Ok(AiBinding {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    project_id: row.get(2)?,
                    runtime_config: row.get(3)?,
                    api_key: row.get(4)?,
                    created_at: row.get(5)?,
                })
            }) {
                Ok(binding) => Ok(Some(binding)),
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

    #[tokio::test]
    async fn at_most_one_binding_per_tenant() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("b.db").to_str().unwrap())
            .await
            .unwrap();
        tenants::insert_tenant(&db, "t1", "op@example.com", "customer")
            .await
            .unwrap();

        let binding = AiBinding {
            id: "b1".to_string(),
            tenant_id: "t1".to_string(),
            project_id: "proj-1".to_string(),
            runtime_config: None,
            api_key: Some("vf-tenant-key".to_string()),
            created_at: String::new(),
        };
        insert_binding(&db, &binding).await.unwrap();

        let mut second = binding.clone();
        second.id = "b2".to_string();
        assert!(insert_binding(&db, &second).await.is_err());

        let found = find_by_tenant(&db, "t1").await.unwrap().unwrap();
        assert_eq!(found.project_id, "proj-1");
        assert_eq!(found.api_key.as_deref(), Some("vf-tenant-key"));
        assert!(find_by_tenant(&db, "t2").await.unwrap().is_none());
    }
}
