// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authenticated HTTP surface of the Gatecheck service.
//!
//! Exposes job triggering and inspection, artifact downloads, and
//! schedule management over axum, with tenant bearer auth and an
//! admin-secret surface.

pub mod auth;
pub mod files;
pub mod handlers;
pub mod server;

pub use server::{build_router, start_server, GatewayState, ServerConfig};
