// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event processing for the Pontis bridge: the retry core, the per-event
//! worker pipeline, the queue drainer, and the two periodic control loops
//! (credential refresher, session cleaner).

pub mod cleaner;
pub mod drainer;
pub mod pipeline;
pub mod refresher;
pub mod retry;

pub use cleaner::sweep_expired_sessions;
pub use drainer::{drain, DrainReport, EventResult};
pub use pipeline::{PipelineOutcome, Stage, Worker};
pub use refresher::{refresh_connection, refresh_expiring, ExchangeCredentials, RefreshOutcome};
pub use retry::{is_transient, run_with_retry, RetryError, RetryPolicy};
