// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Gatecheck orchestration service.
//!
//! Provides the error taxonomy and shared domain types used throughout
//! the workspace: job lifecycle states, trade/move vocabulary, summary
//! statistics, and query-id ordinal helpers.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{GatecheckError, UpstreamError, UpstreamErrorKind};
pub use types::{
    format_query_id, parse_ordinal, Credentials, JobStatus, MoveType, Platform, SummaryStats,
    TradeType,
};
