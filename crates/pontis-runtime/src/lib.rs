// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the conversational-AI runtime.
//!
//! The runtime speaks a record-based dialog protocol: one `interact` POST
//! per user turn, answered by an array of typed records (text, choice,
//! visual, set-variables). Unknown record types are tolerated as
//! unsupported rather than failing the event.

pub mod client;
pub mod context;
pub mod types;

pub use client::RuntimeClient;
pub use context::extract_context_updates;
pub use types::{AiRecord, ChoiceButton};
