// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Gatecheck orchestration service.

use thiserror::Error;

/// Retry classification of an upstream failure.
///
/// The pipeline executor and session manager branch on this: `Transient`
/// gets one stage-level retry, `SessionInvalid` triggers session recovery,
/// `AuthInvalid` enters the delayed acquisition retry loop, and
/// `Permanent` fails the job with the upstream message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    /// Network timeout, connection reset, or a 5xx response.
    Transient,
    /// The upstream rejected the session (400 on an authenticated call).
    SessionInvalid,
    /// 401 during session acquisition.
    AuthInvalid,
    /// Any other 4xx, or a response missing required fields.
    Permanent,
}

impl std::fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamErrorKind::Transient => write!(f, "transient"),
            UpstreamErrorKind::SessionInvalid => write!(f, "session invalid"),
            UpstreamErrorKind::AuthInvalid => write!(f, "auth invalid"),
            UpstreamErrorKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// An upstream call failure carrying its retry classification.
#[derive(Debug, Error)]
#[error("upstream error ({kind}): {message}")]
pub struct UpstreamError {
    /// Retry classification per the taxonomy above.
    pub kind: UpstreamErrorKind,
    /// Human-readable description, including the upstream body where useful.
    pub message: String,
}

impl UpstreamError {
    /// Creates a classified upstream error.
    pub fn new(kind: UpstreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// True when the failure indicates an expired or rejected session.
    pub fn is_session_invalid(&self) -> bool {
        self.kind == UpstreamErrorKind::SessionInvalid
    }

    /// True when the failure is worth a single immediate retry.
    pub fn is_transient(&self) -> bool {
        self.kind == UpstreamErrorKind::Transient
    }
}

/// The primary error type used across the Gatecheck workspace.
#[derive(Debug, Error)]
pub enum GatecheckError {
    /// Configuration errors (invalid TOML, missing required fields, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Relational store errors (connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Artifact store errors (directory creation, atomic write, xlsx codec).
    #[error("artifact error: {message}")]
    Artifact {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A classified upstream failure.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Gateway server errors (bind failure, serve failure).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A newer job for the same tenant superseded this one.
    #[error("cancelled by newer job")]
    CancelledByNewerJob,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatecheckError {
    /// Convenience constructor for artifact errors without a source.
    pub fn artifact(message: impl Into<String>) -> Self {
        GatecheckError::Artifact {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the upstream classification, if this is an upstream error.
    pub fn upstream_kind(&self) -> Option<UpstreamErrorKind> {
        match self {
            GatecheckError::Upstream(e) => Some(e.kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_display_includes_kind_and_message() {
        let err = UpstreamError::new(UpstreamErrorKind::SessionInvalid, "400 from /get_containers");
        let text = err.to_string();
        assert!(text.contains("session invalid"), "got: {text}");
        assert!(text.contains("/get_containers"), "got: {text}");
    }

    #[test]
    fn upstream_kind_is_surfaced_through_gatecheck_error() {
        let err: GatecheckError =
            UpstreamError::new(UpstreamErrorKind::Transient, "connection reset").into();
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::Transient));
        assert!(GatecheckError::Internal("x".into()).upstream_kind().is_none());
    }

    #[test]
    fn cancelled_display_names_the_newer_job_rule() {
        let text = GatecheckError::CancelledByNewerJob.to_string();
        assert!(text.contains("newer job"), "got: {text}");
    }
}
