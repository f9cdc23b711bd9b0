// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context extraction from runtime responses.
//!
//! Two channels feed the session context: explicit `set-variables` records,
//! and inline `[[SET:key=value]]` markers embedded in text payloads. The
//! markers are stripped from the text the participant sees.

use serde_json::{Map, Value};

use crate::types::AiRecord;

const MARKER_OPEN: &str = "[[SET:";
const MARKER_CLOSE: &str = "]]";

/// Collected context updates plus the records with markers stripped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextUpdates {
    pub variables: Map<String, Value>,
    /// The input records with inline markers removed from text payloads and
    /// `set-variables` records dropped (they are not participant-visible).
    pub records: Vec<AiRecord>,
}

/// Scan the response for both update channels and merge them,
/// `set-variables` records first, inline markers second (markers win on
/// key collision since they are the more specific instruction).
pub fn extract_context_updates(records: Vec<AiRecord>) -> ContextUpdates {
    let mut updates = ContextUpdates::default();

    for record in records {
        match record {
            AiRecord::SetVariables { variables } => {
                for (key, value) in variables {
                    updates.variables.insert(key, value);
                }
            }
            AiRecord::Text { message } => {
                let (clean, markers) = strip_markers(&message);
                for (key, value) in markers {
                    updates.variables.insert(key, value);
                }
                if !clean.is_empty() {
                    updates.records.push(AiRecord::Text { message: clean });
                }
            }
            other => updates.records.push(other),
        }
    }

    updates
}

/// Remove `[[SET:key=value]]` markers from `text`, returning the cleaned
/// text and the extracted pairs. Unterminated or key-less markers are left
/// in place untouched.
fn strip_markers(text: &str) -> (String, Map<String, Value>) {
    let mut clean = String::with_capacity(text.len());
    let mut vars = Map::new();
    let mut rest = text;

    while let Some(open) = rest.find(MARKER_OPEN) {
        let after_open = &rest[open + MARKER_OPEN.len()..];
        let Some(close) = after_open.find(MARKER_CLOSE) else {
            break;
        };
        let inner = &after_open[..close];
        match inner.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                vars.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
                clean.push_str(&rest[..open]);
            }
            _ => {
                // Not a well-formed marker: keep it verbatim.
                clean.push_str(&rest[..open + MARKER_OPEN.len() + close + MARKER_CLOSE.len()]);
            }
        }
        rest = &after_open[close + MARKER_CLOSE.len()..];
    }
    clean.push_str(rest);

    (clean.trim().to_string(), vars)
}
