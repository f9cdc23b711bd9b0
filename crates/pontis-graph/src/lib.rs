// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider graph API: outbound message sends and long-lived token
//! exchange for the credential refresher.

pub mod refresh;
pub mod reply;
pub mod send;

pub use refresh::TokenExchange;
pub use reply::{format_reply, FormattedReply, QuickReply, MAX_QUICK_REPLIES};
pub use send::GraphClient;
