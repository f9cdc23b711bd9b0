// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP surface: webhook verification and ingestion, operator
//! drain and cleanup triggers, the provider's data-deletion callback, and
//! a liveness endpoint.

pub mod handlers;
pub mod server;
pub mod state;

pub use server::{build_router, start_server};
pub use state::AppState;
