// SPDX-FileCopyrightText: 2026 Pontis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loading for the Pontis bridge.
//!
//! TOML files merged through the XDG hierarchy with `PONTIS_` environment
//! variable overrides, deserialized into [`model::PontisConfig`] and
//! validated by [`validation::validate_config`].

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::ConfigError;
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::PontisConfig;
pub use validation::validate_config;
