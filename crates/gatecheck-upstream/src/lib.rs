// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed HTTP client for the upstream browser-automation backend.
//!
//! The upstream is a black box that drives the target website through a
//! real browser; this crate wraps its JSON-over-HTTP surface with uniform
//! timeouts, TCP keep-alive, and the error classification the pipeline
//! executor's retry and recovery logic depends on.

pub mod client;
pub mod types;

pub use client::UpstreamClient;
pub use types::{
    AcquiredSession, ActiveSessions, BulkInfo, Download, ExportInfo, ImportInfo, Listing,
    Milestone, ProbeOutcome, ProbeRequest,
};
