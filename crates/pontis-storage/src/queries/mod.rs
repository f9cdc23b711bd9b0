// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table family.

pub mod bindings;
pub mod connections;
pub mod conversations;
pub mod dead_letters;
pub mod erasure;
pub mod messages;
pub mod queue;
pub mod sessions;
pub mod tenants;
pub mod traces;
pub mod webhooks;
