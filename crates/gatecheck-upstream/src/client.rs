// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the upstream browser-automation API.
//!
//! Provides [`UpstreamClient`], a thin typed wrapper that handles request
//! construction, the uniform call timeout, TCP keep-alive, and the error
//! classification that drives retry and session recovery downstream.

use std::time::Duration;

use gatecheck_core::{Credentials, GatecheckError, TradeType, UpstreamError, UpstreamErrorKind};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{
    AcquiredSession, ActiveSessions, BulkInfo, Download, Listing, ProbeOutcome, ProbeRequest,
};

/// Typed HTTP client for the upstream backend.
///
/// Every call shares one upper-bound timeout; the upstream drives a real
/// browser, so individual flows routinely run for minutes. The underlying
/// transport keeps TCP connections alive across those long calls.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    /// Creates a new upstream client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the upstream API, without trailing slash
    /// * `timeout` - Upper bound applied to every call
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatecheckError> {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| GatecheckError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /get_session`: establish (or reuse) an upstream session.
    ///
    /// 401 classifies as `AuthInvalid`; the session manager owns the
    /// delayed retry loop for that case.
    pub async fn acquire_session(
        &self,
        creds: &Credentials,
    ) -> Result<AcquiredSession, UpstreamError> {
        let body = serde_json::json!({
            "username": creds.username,
            "password": creds.password,
            "captcha_api_key": creds.captcha_api_key,
        });
        self.post_json("/get_session", &body, classify_acquire).await
    }

    /// `POST /list_active_sessions`: sessions the upstream still knows
    /// for this username.
    pub async fn list_active_sessions(
        &self,
        username: &str,
    ) -> Result<ActiveSessions, UpstreamError> {
        let body = serde_json::json!({ "username": username });
        self.post_json("/list_active_sessions", &body, classify_plain)
            .await
    }

    /// `POST /get_containers`: full container listing; returns the URL of
    /// the generated spreadsheet.
    pub async fn list_items(&self, session_id: &str) -> Result<Listing, UpstreamError> {
        let body = serde_json::json!({
            "session_id": session_id,
            "infinite_scrolling": true,
            "return_url": true,
        });
        self.post_json("/get_containers", &body, classify_authenticated)
            .await
    }

    /// `POST /get_appointments`: full appointment listing, same shape as
    /// [`Self::list_items`].
    pub async fn list_appointments(&self, session_id: &str) -> Result<Listing, UpstreamError> {
        let body = serde_json::json!({
            "session_id": session_id,
            "infinite_scrolling": true,
            "return_url": true,
        });
        self.post_json("/get_appointments", &body, classify_authenticated)
            .await
    }

    /// `POST /get_bulk_info`: batch enrichment for the filtered ids,
    /// partitioned by trade direction.
    pub async fn get_bulk_info(
        &self,
        session_id: &str,
        import_ids: &[String],
        export_ids: &[String],
    ) -> Result<BulkInfo, UpstreamError> {
        let body = serde_json::json!({
            "session_id": session_id,
            "import_ids": import_ids,
            "export_ids": export_ids,
        });
        self.post_json("/get_bulk_info", &body, classify_authenticated)
            .await
    }

    /// `POST /check_appointments`: probe appointment availability for a
    /// single item.
    #[allow(clippy::too_many_arguments)]
    pub async fn probe_appointments(
        &self,
        session_id: &str,
        kind: TradeType,
        terminal: &str,
        move_type: &str,
        trucking_company: &str,
        identifier: &str,
        truck_plate: &str,
        own_chassis: bool,
    ) -> Result<ProbeOutcome, UpstreamError> {
        let request = ProbeRequest {
            session_id: session_id.to_string(),
            check_type: match kind {
                TradeType::Import => "import".to_string(),
                TradeType::Export => "export".to_string(),
            },
            trucking_company: trucking_company.to_string(),
            terminal: terminal.to_string(),
            move_type: move_type.to_string(),
            container_id: identifier.to_string(),
            truck_plate: truck_plate.to_string(),
            own_chassis,
        };
        self.post_json("/check_appointments", &request, classify_authenticated)
            .await
    }

    /// `GET {url}`: raw download of a spreadsheet or screenshot.
    ///
    /// The URLs come from listing/probe responses and are authenticated by
    /// the upstream against the same session context, so failures here
    /// classify like any other authenticated call.
    pub async fn download(&self, url: &str) -> Result<Download, UpstreamError> {
        debug!(url, "downloading upstream file");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_authenticated(status, &body, url));
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        Ok(Download {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    /// Shared POST-and-decode path. `classify` maps a non-success status
    /// (plus body) to its retry classification for this call context.
    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
        classify: fn(StatusCode, &str, &str) -> UpstreamError,
    ) -> Result<T, UpstreamError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        debug!(status = %status, path, "upstream response received");

        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            warn!(status = %status, path, "upstream call failed");
            return Err(classify(status, &body_text, path));
        }

        let body_text = response.text().await.map_err(map_transport_error)?;
        serde_json::from_str(&body_text).map_err(|e| {
            UpstreamError::new(
                UpstreamErrorKind::Permanent,
                format!("invalid JSON from {path}: {e}"),
            )
        })
    }
}

/// Maps reqwest transport failures. Timeouts, connection resets, and other
/// network-level errors are all retryable.
fn map_transport_error(e: reqwest::Error) -> UpstreamError {
    UpstreamError::new(
        UpstreamErrorKind::Transient,
        format!("HTTP request failed: {e}"),
    )
}

/// Classification for authenticated calls (listings, bulk info, probes,
/// downloads): 400 means the upstream silently invalidated the session.
fn classify_authenticated(status: StatusCode, body: &str, path: &str) -> UpstreamError {
    let kind = match status.as_u16() {
        400 => UpstreamErrorKind::SessionInvalid,
        500..=599 => UpstreamErrorKind::Transient,
        _ => UpstreamErrorKind::Permanent,
    };
    UpstreamError::new(kind, format!("{path} returned {status}: {body}"))
}

/// Classification for `acquire_session`: 401 enters the delayed
/// acquisition retry loop instead of session recovery.
fn classify_acquire(status: StatusCode, body: &str, path: &str) -> UpstreamError {
    let kind = match status.as_u16() {
        401 => UpstreamErrorKind::AuthInvalid,
        500..=599 => UpstreamErrorKind::Transient,
        _ => UpstreamErrorKind::Permanent,
    };
    UpstreamError::new(kind, format!("{path} returned {status}: {body}"))
}

/// Classification for unauthenticated utility calls.
fn classify_plain(status: StatusCode, body: &str, path: &str) -> UpstreamError {
    let kind = if status.is_server_error() {
        UpstreamErrorKind::Transient
    } else {
        UpstreamErrorKind::Permanent
    };
    UpstreamError::new(kind, format!("{path} returned {status}: {body}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> UpstreamClient {
        UpstreamClient::new(base_url, Duration::from_secs(5)).unwrap()
    }

    fn test_creds() -> Credentials {
        Credentials {
            username: "jdoe".into(),
            password: "hunter2".into(),
            captcha_api_key: "cap-key".into(),
        }
    }

    #[tokio::test]
    async fn acquire_session_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/get_session"))
            .and(body_partial_json(serde_json::json!({"username": "jdoe"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "session_id": "sess-abc",
                "reused": false
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let session = client.acquire_session(&test_creds()).await.unwrap();
        assert_eq!(session.session_id, "sess-abc");
        assert!(!session.reused);
    }

    #[tokio::test]
    async fn acquire_session_401_classifies_auth_invalid() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/get_session"))
            .respond_with(ResponseTemplate::new(401).set_body_string("captcha rejected"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.acquire_session(&test_creds()).await.unwrap_err();
        assert_eq!(err.kind, UpstreamErrorKind::AuthInvalid);
        assert!(err.message.contains("captcha rejected"), "got: {err}");
    }

    #[tokio::test]
    async fn list_items_400_classifies_session_invalid() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/get_containers"))
            .respond_with(ResponseTemplate::new(400).set_body_string("session expired"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.list_items("sess-old").await.unwrap_err();
        assert!(err.is_session_invalid(), "got: {err}");
    }

    #[tokio::test]
    async fn list_items_503_classifies_transient() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/get_containers"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.list_items("sess").await.unwrap_err();
        assert!(err.is_transient(), "got: {err}");
    }

    #[tokio::test]
    async fn probe_404_classifies_permanent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/check_appointments"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .probe_appointments(
                "sess",
                TradeType::Import,
                "ITS Long Beach",
                "PICK FULL",
                "K & R TRANSPORTATION LLC",
                "MSCU1234567",
                "ABC123",
                false,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, UpstreamErrorKind::Permanent);
    }

    #[tokio::test]
    async fn probe_sends_derived_fields() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/check_appointments"))
            .and(body_partial_json(serde_json::json!({
                "check_type": "export",
                "move_type": "DROP FULL",
                "container_id": "BKG-9001",
                "own_chassis": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "calendar_found": true,
                "screenshot_url": format!("{}/shots/1.png", server.uri())
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let outcome = client
            .probe_appointments(
                "sess",
                TradeType::Export,
                "TraPac LLC - Los Angeles",
                "DROP FULL",
                "K & R TRANSPORTATION LLC",
                "BKG-9001",
                "ABC123",
                false,
            )
            .await
            .unwrap();
        assert_eq!(outcome.calendar_found, Some(true));
        assert!(outcome.available_times.is_empty());
    }

    #[tokio::test]
    async fn bulk_info_deserializes_both_partitions() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/get_bulk_info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "import": [{
                    "item_id": "MSCU1234567",
                    "pregate_passed": true,
                    "timeline": [
                        {"milestone": "Manifested", "date": "03/24/2025 13:10"},
                        {"milestone": "Departed Terminal"}
                    ]
                }],
                "export": [{"item_id": "TGHU7654321", "booking_number": "BKG-9001"}]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let bulk = client
            .get_bulk_info("sess", &["MSCU1234567".into()], &["TGHU7654321".into()])
            .await
            .unwrap();
        assert_eq!(bulk.import.len(), 1);
        assert!(bulk.import[0].pregate_passed);
        assert_eq!(bulk.import[0].timeline.len(), 2);
        assert_eq!(bulk.import[0].timeline[1].date, None);
        assert_eq!(bulk.export[0].booking_number.as_deref(), Some("BKG-9001"));
    }

    #[tokio::test]
    async fn download_returns_bytes_and_content_type() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/files/x.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![0x89u8, 0x50, 0x4e, 0x47]),
            )
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let download = client
            .download(&format!("{}/files/x.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(download.bytes, vec![0x89u8, 0x50, 0x4e, 0x47]);
        assert_eq!(download.content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn invalid_json_classifies_permanent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/get_containers"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client.list_items("sess").await.unwrap_err();
        assert_eq!(err.kind, UpstreamErrorKind::Permanent);
        assert!(err.message.contains("invalid JSON"), "got: {err}");
    }
}
