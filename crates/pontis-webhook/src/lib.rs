// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook handling: signature authentication, the subscription
//! challenge handshake, normalization of the two provider payload
//! variants, and signed-request parsing for erasure callbacks.

pub mod challenge;
pub mod normalize;
pub mod signature;
pub mod signed_request;

pub use challenge::{respond_to_challenge, ChallengeError, VerifyQuery};
pub use normalize::{collect_events, normalize, EventEnvelope};
pub use signature::verify_signature;
pub use signed_request::{confirmation_code, parse_signed_request, SignedRequest};
