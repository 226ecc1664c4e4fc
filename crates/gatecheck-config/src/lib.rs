// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration for the Gatecheck service.
//!
//! TOML files (XDG hierarchy) merged with `GATECHECK_*` environment
//! variable overrides, strict unknown-key rejection, and a semantic
//! validation pass.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::GatecheckConfig;
pub use validation::validate_config;
