// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Social connection rows: provider assets and their access credentials.
//!
//! Read-mostly; only the credential refresher mutates them.

use pontis_core::PontisError;
use rusqlite::params;

use crate::database::{map_tr_err, Database};
use crate::models::SocialConnection;

const CONNECTION_COLUMNS: &str = "id, tenant_id, platform, page_id, account_id, access_token,
             token_expiry, refreshed_at, created_at";

fn row_to_connection(row: &rusqlite::Row<'_>) -> Result<SocialConnection, rusqlite::Error> {
    Ok(SocialConnection {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        platform: row.get(2)?,
        page_id: row.get(3)?,
        account_id: row.get(4)?,
        access_token: row.get(5)?,
        token_expiry: row.get(6)?,
        refreshed_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Insert a connection (admin surface / test fixtures).
pub async fn insert_connection(
    db: &Database,
    connection: &SocialConnection,
) -> Result<(), PontisError> {
    let c = connection.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO connections (id, tenant_id, platform, page_id, account_id,
                     access_token, token_expiry, refreshed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    c.id,
                    c.tenant_id,
                    c.platform,
                    c.page_id,
                    c.account_id,
                    c.access_token,
                    c.token_expiry,
                    c.refreshed_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Resolve the connection acting as `asset_id` for a tenant on a platform.
/// The asset is the webhook event's recipient: a page id on the page
/// variant, an account id on the photo variant.
pub async fn find_by_asset(
    db: &Database,
    tenant_id: &str,
    platform: &str,
    asset_id: &str,
) -> Result<Option<SocialConnection>, PontisError> {
    let tenant_id = tenant_id.to_string();
    let platform = platform.to_string();
    let asset_id = asset_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONNECTION_COLUMNS} FROM connections
                 WHERE tenant_id = ?1 AND platform = ?2
                   AND (page_id = ?3 OR account_id = ?3)
                 LIMIT 1"
            ))?;
            match stmt.query_row(params![tenant_id, platform, asset_id], row_to_connection) {
                Ok(connection) => Ok(Some(connection)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a single connection.
pub async fn get_connection(
    db: &Database,
    id: &str,
) -> Result<Option<SocialConnection>, PontisError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_connection) {
                Ok(connection) => Ok(Some(connection)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Connections whose token expires within `threshold_days`, the refresh
/// loop's work list. Already-expired tokens are included; exchanging them
/// may still succeed.
pub async fn list_expiring(
    db: &Database,
    threshold_days: i64,
) -> Result<Vec<SocialConnection>, PontisError> {
    let modifier = format!("+{threshold_days} days");
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONNECTION_COLUMNS} FROM connections
                 WHERE token_expiry < strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)
                 ORDER BY token_expiry ASC"
            ))?;
            let rows = stmt.query_map(params![modifier], row_to_connection)?;
            let mut connections = Vec::new();
            for row in rows {
                connections.push(row?);
            }
            Ok(connections)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a successful token exchange.
pub async fn update_token(
    db: &Database,
    id: &str,
    access_token: &str,
    token_expiry: &str,
    refreshed_at: &str,
) -> Result<(), PontisError> {
    let id = id.to_string();
    let access_token = access_token.to_string();
    let token_expiry = token_expiry.to_string();
    let refreshed_at = refreshed_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE connections
                 SET access_token = ?1, token_expiry = ?2, refreshed_at = ?3
                 WHERE id = ?4",
                params![access_token, token_expiry, refreshed_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
