// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! These types represent rows in the SQLite database. Status and platform
//! columns are plain strings with documented values; the typed enums live
//! in `pontis-core` and are rendered at the query boundary.

use serde::{Deserialize, Serialize};

/// An operator account receiving messages through the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub email: String,
    /// "admin" or "customer".
    pub role: String,
    pub created_at: String,
    /// Set by a data-erasure request; soft-deleted tenants stop matching
    /// webhook routes.
    pub deleted_at: Option<String>,
}

/// Binds a tenant to a provider asset plus the credentials for acting on
/// its behalf. Exactly one of `page_id` / `account_id` is non-null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialConnection {
    pub id: String,
    pub tenant_id: String,
    /// "page" or "photo".
    pub platform: String,
    pub page_id: Option<String>,
    pub account_id: Option<String>,
    /// Write-mostly; never logged or echoed back to the operator UI.
    pub access_token: String,
    pub token_expiry: String,
    pub refreshed_at: Option<String>,
    pub created_at: String,
}

impl SocialConnection {
    /// The provider asset id this connection acts as, regardless of variant.
    pub fn asset_id(&self) -> &str {
        self.page_id
            .as_deref()
            .or(self.account_id.as_deref())
            .unwrap_or_default()
    }
}

/// Per-(tenant, platform) webhook endpoint registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookRegistration {
    pub id: String,
    pub tenant_id: String,
    /// "page", "photo", or "any".
    pub platform: String,
    pub verification_token: String,
    pub webhook_url: Option<String>,
    pub generated_url: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

/// Per-tenant mapping to an AI-runtime project and credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiBinding {
    pub id: String,
    pub tenant_id: String,
    pub project_id: String,
    /// Opaque runtime configuration JSON.
    pub runtime_config: Option<String>,
    /// Per-tenant API key override; falls back to the global default.
    pub api_key: Option<String>,
    pub created_at: String,
}

/// Per-(tenant, participant, platform) dialog context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub tenant_id: String,
    pub participant_id: String,
    /// "page" or "photo".
    pub platform: String,
    /// Opaque JSON context map; see `pontis_core::context`.
    pub context: String,
    pub last_interaction: String,
    pub expires_at: String,
}

/// Logical thread between a participant and a tenant asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub tenant_id: String,
    /// "page" or "photo".
    pub platform: String,
    pub external_thread_id: String,
    pub participant_id: String,
    /// Monotonically non-decreasing.
    pub last_message_at: String,
    pub session_id: Option<String>,
}

/// One atomic exchange record within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    /// "user" or "assistant".
    pub sender: String,
    pub content: String,
    /// Provider message id when known.
    pub external_id: Option<String>,
    pub sent_at: String,
}

/// Durable record of an inbound webhook event awaiting processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedEvent {
    pub id: String,
    pub tenant_id: String,
    /// "page" or "photo".
    pub platform: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub raw_payload: String,
    pub event_ts: String,
    /// "pending", "processing", "completed", "failed".
    pub status: String,
    pub retry_count: i64,
    pub last_retry_at: Option<String>,
    pub error: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
}

/// Append-only per-event audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingTrace {
    pub id: i64,
    pub queued_event_id: String,
    pub stage: String,
    /// "completed" or "failed".
    pub status: String,
    pub error: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
}

/// A terminally-failed event parked for manual handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub id: String,
    pub tenant_id: String,
    pub original_payload: String,
    pub error: String,
    pub metadata: Option<String>,
    pub failed_at: String,
    pub status: String,
    pub retry_count: i64,
}
