// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-tenant upstream session lifecycle.
//!
//! The [`SessionManager`] is the only writer of `tenant.session_id`. A
//! session is reused until an authenticated call classifies as
//! `SessionInvalid`; recovery then drops the persisted id before
//! acquiring a replacement. Acquisition prefers adopting a session the
//! upstream still considers active over logging in again, and a 401
//! (captcha/credential trouble) enters a long cancelable retry loop that
//! a newer job for the same tenant can abandon.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use gatecheck_config::model::SessionConfig;
use gatecheck_core::{Credentials, GatecheckError, UpstreamErrorKind};
use gatecheck_store::queries::{jobs, tenants};
use gatecheck_store::{Database, Tenant};
use gatecheck_upstream::UpstreamClient;
use tracing::{debug, info, warn};

/// Obtains, reuses, invalidates, and recreates upstream sessions.
pub struct SessionManager {
    db: Database,
    client: Arc<UpstreamClient>,
    config: SessionConfig,
}

impl SessionManager {
    /// Creates a session manager over the shared store and client.
    pub fn new(db: Database, client: Arc<UpstreamClient>, config: SessionConfig) -> Self {
        Self { db, client, config }
    }

    /// Returns a usable session id for the tenant.
    ///
    /// The persisted session is returned as-is, with no upstream call;
    /// validity is only discovered by the next authenticated call.
    /// Without one, a new session is acquired and persisted.
    pub async fn ensure(
        &self,
        tenant: &Tenant,
        job_ordinal: Option<i64>,
    ) -> Result<String, GatecheckError> {
        // Re-read the row: another job or a recovery may have updated it
        // since the caller loaded its tenant snapshot.
        let current = tenants::get_tenant(&self.db, tenant.id)
            .await?
            .and_then(|t| t.session_id);
        if let Some(session_id) = current {
            debug!(tenant_id = tenant.id, "reusing persisted upstream session");
            return Ok(session_id);
        }
        self.acquire_and_persist(tenant, job_ordinal).await
    }

    /// Unconditionally drops the current session and acquires a new one.
    ///
    /// The null is persisted first so a crash between the two steps never
    /// leaves a known-bad session id behind.
    pub async fn recover(
        &self,
        tenant: &Tenant,
        job_ordinal: Option<i64>,
    ) -> Result<String, GatecheckError> {
        info!(tenant_id = tenant.id, "recovering upstream session");
        tenants::set_session_id(&self.db, tenant.id, None).await?;
        self.acquire_and_persist(tenant, job_ordinal).await
    }

    async fn acquire_and_persist(
        &self,
        tenant: &Tenant,
        job_ordinal: Option<i64>,
    ) -> Result<String, GatecheckError> {
        let creds = gatecheck_artifacts::read_credentials(Path::new(&tenant.folder_path), "emodal")?;
        let session_id = self.acquire(&creds, tenant.id, job_ordinal).await?;
        tenants::set_session_id(&self.db, tenant.id, Some(&session_id)).await?;
        info!(tenant_id = tenant.id, "upstream session persisted");
        Ok(session_id)
    }

    /// The acquisition algorithm: adopt the first session the upstream
    /// still knows for this username, else log in, retrying a 401 up to
    /// the configured attempt count with cancelable waits in between.
    async fn acquire(
        &self,
        creds: &Credentials,
        tenant_id: i64,
        job_ordinal: Option<i64>,
    ) -> Result<String, GatecheckError> {
        match self.client.list_active_sessions(&creds.username).await {
            Ok(active) => {
                if let Some(session_id) = active.sessions.into_iter().next() {
                    info!(tenant_id, "adopting active upstream session");
                    return Ok(session_id);
                }
            }
            Err(e) => {
                // Adoption is an optimization; fall through to a login.
                warn!(tenant_id, error = %e, "active-session listing failed");
            }
        }

        let max_attempts = self.config.acquire_max_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.acquire_session(creds).await {
                Ok(session) => {
                    info!(tenant_id, reused = session.reused, "upstream session acquired");
                    return Ok(session.session_id);
                }
                Err(e) if e.kind == UpstreamErrorKind::AuthInvalid && attempt < max_attempts => {
                    warn!(
                        tenant_id,
                        attempt,
                        max_attempts,
                        "session acquisition rejected (401), waiting before retry"
                    );
                    self.cancelable_wait(tenant_id, job_ordinal).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Sleeps the configured retry delay in poll-sized quanta; each
    /// quantum ends with a newer-job check that abandons the wait.
    async fn cancelable_wait(
        &self,
        tenant_id: i64,
        job_ordinal: Option<i64>,
    ) -> Result<(), GatecheckError> {
        let total = Duration::from_secs(self.config.acquire_retry_minutes * 60);
        let quantum = Duration::from_secs(self.config.poll_seconds);
        let mut waited = Duration::ZERO;
        while waited < total {
            let step = quantum.min(total - waited);
            tokio::time::sleep(step).await;
            waited += step;
            if let Some(ordinal) = job_ordinal {
                if jobs::find_newer(&self.db, tenant_id, ordinal).await? {
                    info!(tenant_id, ordinal, "acquisition wait abandoned: newer job exists");
                    return Err(GatecheckError::CancelledByNewerJob);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatecheck_store::queries::tenants::create_tenant;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup(server: &MockServer) -> (Database, Tenant, Arc<UpstreamClient>, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();
        let tenant = create_tenant(&db, "t", "tok", dir.path().to_str().unwrap())
            .await
            .unwrap();
        std::fs::create_dir_all(&tenant.folder_path).unwrap();
        std::fs::write(
            Path::new(&tenant.folder_path).join("credentials.json"),
            serde_json::json!({
                "emodal": {"username": "jdoe", "password": "pw", "captcha_api_key": "cap"}
            })
            .to_string(),
        )
        .unwrap();
        let client = Arc::new(
            UpstreamClient::new(server.uri(), Duration::from_secs(5)).unwrap(),
        );
        (db, tenant, client, dir)
    }

    fn fast_config() -> SessionConfig {
        SessionConfig {
            acquire_max_retries: 3,
            acquire_retry_minutes: 0,
            poll_seconds: 1,
        }
    }

    fn mock_no_active_sessions() -> Mock {
        Mock::given(method("POST"))
            .and(path("/list_active_sessions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"sessions": []})),
            )
    }

    #[tokio::test]
    async fn ensure_reuses_persisted_session_without_upstream_call() {
        let server = MockServer::start().await;
        let (db, tenant, client, _dir) = setup(&server).await;
        tenants::set_session_id(&db, tenant.id, Some("sess-live"))
            .await
            .unwrap();

        let manager = SessionManager::new(db.clone(), client, fast_config());
        let session = manager.ensure(&tenant, None).await.unwrap();
        assert_eq!(session, "sess-live");
        // No mocks were registered; any upstream call would have errored.
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn ensure_acquires_and_persists_when_no_session() {
        let server = MockServer::start().await;
        let (db, tenant, client, _dir) = setup(&server).await;

        mock_no_active_sessions().mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/get_session"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"session_id": "sess-new", "reused": false}),
            ))
            .mount(&server)
            .await;

        let manager = SessionManager::new(db.clone(), client, fast_config());
        let session = manager.ensure(&tenant, None).await.unwrap();
        assert_eq!(session, "sess-new");

        let stored = tenants::get_tenant(&db, tenant.id).await.unwrap().unwrap();
        assert_eq!(stored.session_id.as_deref(), Some("sess-new"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recover_adopts_active_session_when_available() {
        let server = MockServer::start().await;
        let (db, tenant, client, _dir) = setup(&server).await;
        tenants::set_session_id(&db, tenant.id, Some("sess-dead"))
            .await
            .unwrap();

        Mock::given(method("POST"))
            .and(path("/list_active_sessions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"sessions": ["sess-adopted", "sess-other"]}),
            ))
            .mount(&server)
            .await;

        let manager = SessionManager::new(db.clone(), client, fast_config());
        let session = manager.recover(&tenant, None).await.unwrap();
        assert_eq!(session, "sess-adopted");

        let stored = tenants::get_tenant(&db, tenant.id).await.unwrap().unwrap();
        assert_eq!(stored.session_id.as_deref(), Some("sess-adopted"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn acquisition_retries_401_up_to_the_attempt_budget() {
        let server = MockServer::start().await;
        let (db, tenant, client, _dir) = setup(&server).await;

        mock_no_active_sessions().mount(&server).await;
        // All attempts 401: with zero retry delay, three attempts then failure.
        Mock::given(method("POST"))
            .and(path("/get_session"))
            .respond_with(ResponseTemplate::new(401).set_body_string("captcha rejected"))
            .expect(3)
            .mount(&server)
            .await;

        let manager = SessionManager::new(db.clone(), client, fast_config());
        let err = manager.ensure(&tenant, None).await.unwrap_err();
        assert_eq!(
            err.upstream_kind(),
            Some(UpstreamErrorKind::AuthInvalid),
            "got: {err}"
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn acquisition_wait_is_cancelled_by_newer_job() {
        let server = MockServer::start().await;
        let (db, tenant, client, _dir) = setup(&server).await;

        mock_no_active_sessions().mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/get_session"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        // The waiting job, then a newer one for the same tenant.
        let older = jobs::create_job(&db, tenant.id, "emodal", "q").await.unwrap();
        let _newer = jobs::create_job(&db, tenant.id, "emodal", "q").await.unwrap();

        let config = SessionConfig {
            acquire_max_retries: 3,
            acquire_retry_minutes: 1,
            poll_seconds: 1,
        };
        let manager = SessionManager::new(db.clone(), client, config);
        let err = manager
            .ensure(&tenant, older.ordinal())
            .await
            .unwrap_err();
        assert!(
            matches!(err, GatecheckError::CancelledByNewerJob),
            "got: {err}"
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn permanent_acquisition_errors_fail_immediately() {
        let server = MockServer::start().await;
        let (db, tenant, client, _dir) = setup(&server).await;

        mock_no_active_sessions().mount(&server).await;
        Mock::given(method("POST"))
            .and(path("/get_session"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let manager = SessionManager::new(db.clone(), client, fast_config());
        let err = manager.ensure(&tenant, None).await.unwrap_err();
        assert_eq!(err.upstream_kind(), Some(UpstreamErrorKind::Permanent));
        db.close().await.unwrap();
    }
}
