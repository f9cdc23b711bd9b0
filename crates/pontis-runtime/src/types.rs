// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed intermediates for the runtime's record protocol.

use serde_json::{Map, Value};

/// One button offered by a `choice` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceButton {
    /// Display label.
    pub name: String,
    /// Payload submitted back when tapped; defaults to the label.
    pub payload: String,
}

/// One response record from the runtime.
///
/// The wire shape is a tagged JSON object; anything with an unrecognized
/// `type` becomes [`AiRecord::Unsupported`] so a single odd record never
/// sinks the event.
#[derive(Debug, Clone, PartialEq)]
pub enum AiRecord {
    Text { message: String },
    Choice { buttons: Vec<ChoiceButton> },
    Visual { image_url: String },
    SetVariables { variables: Map<String, Value> },
    Unsupported { record_type: String },
}

impl AiRecord {
    /// Parse one wire record.
    pub fn from_value(value: &Value) -> AiRecord {
        let record_type = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let payload = value.get("payload");

        match record_type {
            "text" | "speak" => {
                let message = payload
                    .and_then(|p| {
                        p.as_str()
                            .map(str::to_string)
                            .or_else(|| {
                                p.get("message").and_then(Value::as_str).map(str::to_string)
                            })
                    })
                    .unwrap_or_default();
                AiRecord::Text { message }
            }
            "choice" => {
                let buttons = payload
                    .and_then(|p| p.get("buttons"))
                    .and_then(Value::as_array)
                    .map(|entries| entries.iter().filter_map(parse_button).collect())
                    .unwrap_or_default();
                AiRecord::Choice { buttons }
            }
            "visual" => {
                let image_url = payload
                    .and_then(|p| p.get("image"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                AiRecord::Visual { image_url }
            }
            "set-variables" => {
                let variables = payload
                    .and_then(|p| {
                        // Either the payload is the map, or it nests one
                        // under `variables`.
                        p.get("variables")
                            .and_then(Value::as_object)
                            .or_else(|| p.as_object())
                            .cloned()
                    })
                    .unwrap_or_default();
                AiRecord::SetVariables { variables }
            }
            other => AiRecord::Unsupported {
                record_type: other.to_string(),
            },
        }
    }

    /// Parse a whole response array.
    pub fn from_response(records: &[Value]) -> Vec<AiRecord> {
        records.iter().map(AiRecord::from_value).collect()
    }
}

fn parse_button(value: &Value) -> Option<ChoiceButton> {
    let name = value.get("name").and_then(Value::as_str)?.to_string();
    let payload = value
        .pointer("/request/payload")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| {
            value
                .pointer("/request/type")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| name.clone());
    Some(ChoiceButton { name, payload })
}
