// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite data service for the Pontis bridge.
//!
//! Realizes the abstract transactional data service the rest of the
//! workspace programs against: a single [`Database`] handle whose writes
//! are serialized through tokio-rusqlite's background thread, refinery
//! embedded migrations, and typed query modules per table family.
//!
//! The single writer thread is what makes read-modify-write session
//! context updates and conditional queue claims atomic: every mutation
//! runs as one closure on one connection.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
