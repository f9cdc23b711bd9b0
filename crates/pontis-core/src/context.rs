// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The opaque session context map.
//!
//! A session's context is a JSON object of scalar values plus one reserved
//! key, `conversationHistory`, holding an ordered list of
//! `{role, content, ts}` entries. There is deliberately no compile-time
//! schema for the rest of the map: the AI runtime reads and writes
//! arbitrary keys through `set-variables` records and inline markers.
//!
//! Mutations happen read-modify-write under the storage layer's single
//! writer thread, so two concurrent history appends both land.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved context key holding the dialog history.
pub const HISTORY_KEY: &str = "conversationHistory";

/// Context key stamped on every write.
pub const LAST_UPDATED_KEY: &str = "lastUpdated";

/// Maximum history entries retained at rest.
pub const HISTORY_LIMIT: usize = 50;

/// One turn in the dialog history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
    /// Canonical millisecond UTC timestamp of the turn.
    pub ts: String,
}

/// The opaque per-session context map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionContext(pub Map<String, Value>);

impl SessionContext {
    /// Parses a stored context column. Anything that is not a JSON object
    /// (including the empty string) yields an empty context rather than an
    /// error: a corrupt context must not poison the whole event.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => SessionContext(map),
            _ => SessionContext::default(),
        }
    }

    /// Serializes for storage.
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Current history entries, oldest first. Entries that do not match the
    /// expected shape are skipped.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.0
            .get(HISTORY_KEY)
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| serde_json::from_value(e.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Appends one turn to the history and truncates to the newest `limit`
    /// entries. Re-appending the exact entry already at the tail is a no-op,
    /// which makes replayed updates with the same timestamp idempotent.
    pub fn push_history(&mut self, role: &str, content: &str, ts: &str, limit: usize) {
        let entry = serde_json::json!({ "role": role, "content": content, "ts": ts });

        let history = self
            .0
            .entry(HISTORY_KEY.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(entries) = history else {
            // A scalar squatting on the reserved key is replaced.
            *history = Value::Array(vec![entry]);
            self.stamp(ts);
            return;
        };

        if entries.last() == Some(&entry) {
            return;
        }
        entries.push(entry);
        if entries.len() > limit {
            let excess = entries.len() - limit;
            entries.drain(..excess);
        }
        self.stamp(ts);
    }

    /// Merges scalar keys into the root map. The reserved history key is
    /// never overwritten through this path.
    pub fn merge_scalars(&mut self, vars: &Map<String, Value>, now: &str) {
        let mut touched = false;
        for (key, value) in vars {
            if key == HISTORY_KEY {
                continue;
            }
            self.0.insert(key.clone(), value.clone());
            touched = true;
        }
        if touched {
            self.stamp(now);
        }
    }

    /// Stamps `lastUpdated`.
    pub fn stamp(&mut self, now: &str) {
        self.0
            .insert(LAST_UPDATED_KEY.to_string(), Value::String(now.to_string()));
    }

    /// Root scalar entries flattened for the AI runtime's `state.variables`.
    /// The history list is excluded; it travels as persisted dialog state,
    /// not as runtime variables.
    pub fn flatten_variables(&self) -> Map<String, Value> {
        self.0
            .iter()
            .filter(|(key, _)| key.as_str() != HISTORY_KEY)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
