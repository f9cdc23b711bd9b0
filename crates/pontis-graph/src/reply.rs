// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collapses runtime response records into the provider-ready reply shape:
//! one text body, at most [`MAX_QUICK_REPLIES`] quick replies, and at most
//! one attachment.

use pontis_runtime::{AiRecord, ChoiceButton};
use serde::Serialize;

/// The provider caps quick replies per message.
pub const MAX_QUICK_REPLIES: usize = 13;

/// One outbound quick-reply button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuickReply {
    pub content_type: &'static str,
    pub title: String,
    pub payload: String,
}

impl From<&ChoiceButton> for QuickReply {
    fn from(button: &ChoiceButton) -> Self {
        QuickReply {
            content_type: "text",
            title: button.name.clone(),
            payload: button.payload.clone(),
        }
    }
}

/// Provider-ready reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedReply {
    pub text: String,
    pub quick_replies: Vec<QuickReply>,
    /// URL of the single attachment image, when a visual record was present.
    pub attachment_url: Option<String>,
}

/// Collapse records into one reply. Text records join with newlines, all
/// choice buttons pool into the quick-reply list (first `MAX_QUICK_REPLIES`
/// win), and the first visual supplies the attachment. Returns `None` when
/// nothing is sendable.
pub fn format_reply(records: &[AiRecord]) -> Option<FormattedReply> {
    let mut text_parts: Vec<&str> = Vec::new();
    let mut quick_replies: Vec<QuickReply> = Vec::new();
    let mut attachment_url: Option<String> = None;

    for record in records {
        match record {
            AiRecord::Text { message } => {
                if !message.is_empty() {
                    text_parts.push(message);
                }
            }
            AiRecord::Choice { buttons } => {
                for button in buttons {
                    if quick_replies.len() < MAX_QUICK_REPLIES {
                        quick_replies.push(QuickReply::from(button));
                    }
                }
            }
            AiRecord::Visual { image_url } => {
                if attachment_url.is_none() && !image_url.is_empty() {
                    attachment_url = Some(image_url.clone());
                }
            }
            AiRecord::SetVariables { .. } | AiRecord::Unsupported { .. } => {}
        }
    }

    let text = text_parts.join("\n");
    if text.is_empty() && quick_replies.is_empty() && attachment_url.is_none() {
        return None;
    }

    Some(FormattedReply {
        text,
        quick_replies,
        attachment_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(n: usize) -> ChoiceButton {
        ChoiceButton {
            name: format!("Option {n}"),
            payload: format!("OPT_{n}"),
        }
    }

    #[test]
    fn text_records_join_with_newlines() {
        let reply = format_reply(&[
            AiRecord::Text { message: "First.".into() },
            AiRecord::Text { message: "Second.".into() },
        ])
        .unwrap();
        assert_eq!(reply.text, "First.\nSecond.");
        assert!(reply.quick_replies.is_empty());
        assert!(reply.attachment_url.is_none());
    }

    #[test]
    fn quick_replies_cap_at_thirteen() {
        let buttons: Vec<ChoiceButton> = (0..20).map(button).collect();
        let reply = format_reply(&[
            AiRecord::Text { message: "Pick one".into() },
            AiRecord::Choice { buttons },
        ])
        .unwrap();
        assert_eq!(reply.quick_replies.len(), MAX_QUICK_REPLIES);
        assert_eq!(reply.quick_replies[0].title, "Option 0");
        assert_eq!(reply.quick_replies[12].payload, "OPT_12");
    }

    #[test]
    fn first_visual_wins() {
        let reply = format_reply(&[
            AiRecord::Visual { image_url: "https://a.example/1.png".into() },
            AiRecord::Visual { image_url: "https://a.example/2.png".into() },
        ])
        .unwrap();
        assert_eq!(reply.attachment_url.as_deref(), Some("https://a.example/1.png"));
        assert!(reply.text.is_empty());
    }

    #[test]
    fn nothing_sendable_yields_none() {
        assert!(format_reply(&[]).is_none());
        assert!(format_reply(&[AiRecord::Unsupported { record_type: "carousel".into() }])
            .is_none());
    }
}
