// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared state threaded to every request handler.
//!
//! Everything is constructed once at startup and passed explicitly; there
//! are no ambient globals.

use std::sync::Arc;

use pontis_config::PontisConfig;
use pontis_storage::Database;
use pontis_worker::Worker;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The data service handle.
    pub db: Database,
    /// Per-event pipeline executor, shared with the background drainer.
    pub worker: Arc<Worker>,
    /// Full bridge configuration (app secret, queue tuning, public URL).
    pub config: Arc<PontisConfig>,
}

impl AppState {
    pub fn new(db: Database, worker: Arc<Worker>, config: Arc<PontisConfig>) -> Self {
        Self { db, worker, config }
    }
}
