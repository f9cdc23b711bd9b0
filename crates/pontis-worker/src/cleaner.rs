// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session cleaner: periodic sweep of lapsed session leases.

use pontis_core::PontisError;
use pontis_storage::queries::sessions;
use pontis_storage::Database;
use tracing::info;

/// Delete sessions whose `expires_at` has passed. Returns the count, which
/// the `/api/session-cleanup` endpoint reports as `cleaned`.
pub async fn sweep_expired_sessions(db: &Database) -> Result<usize, PontisError> {
    let cleaned = sessions::delete_expired(db).await?;
    if cleaned > 0 {
        info!(cleaned, "expired sessions swept");
    }
    Ok(cleaned)
}
