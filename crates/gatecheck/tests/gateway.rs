// SPDX-FileCopyrightText: 2026 Gatecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the gateway HTTP surface over a live engine.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gatecheck_artifacts::{write_xlsx, Table};
use gatecheck_config::model::{PipelineConfig, SessionConfig};
use gatecheck_engine::{JobLauncher, PipelineRunner, Scheduler, SessionManager};
use gatecheck_gateway::{build_router, GatewayState};
use gatecheck_store::queries::tenants;
use gatecheck_store::Database;
use gatecheck_upstream::UpstreamClient;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TENANT_TOKEN: &str = "tok-gw";
const ADMIN_SECRET: &str = "gw-admin-secret";

struct Gateway {
    base_url: String,
    db: Database,
    _dir: TempDir,
}

async fn start_gateway(upstream: &MockServer) -> Gateway {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("gatecheck.db").to_str().unwrap())
        .await
        .unwrap();
    let tenant = tenants::create_tenant(&db, "gw-tenant", TENANT_TOKEN, dir.path().to_str().unwrap())
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

    let client = Arc::new(UpstreamClient::new(upstream.uri(), Duration::from_secs(10)).unwrap());
    let sessions = Arc::new(SessionManager::new(
        db.clone(),
        client.clone(),
        SessionConfig {
            acquire_max_retries: 3,
            acquire_retry_minutes: 0,
            poll_seconds: 1,
        },
    ));
    let runner = Arc::new(PipelineRunner::new(
        db.clone(),
        client,
        sessions,
        PipelineConfig::default(),
    ));
    let launcher = Arc::new(JobLauncher::new(db.clone(), runner));
    let scheduler = Arc::new(Scheduler::new(
        db.clone(),
        launcher.clone(),
        CancellationToken::new(),
        60,
    ));

    let state = GatewayState {
        db: db.clone(),
        launcher,
        scheduler,
        admin_secret: Some(ADMIN_SECRET.to_string()),
        start_time: Instant::now(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    Gateway {
        base_url: format!("http://{addr}"),
        db,
        _dir: dir,
    }
}

/// Mounts a trivially successful upstream: empty listing, no probes.
async fn mount_empty_upstream(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/list_active_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"sessions": []})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/get_session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({"session_id": "sess-gw", "reused": false}),
        ))
        .mount(server)
        .await;

    let empty = Table::new(vec![
        "Container #".to_string(),
        "Holds".to_string(),
        "Pregate Ticket#".to_string(),
    ]);
    let bytes = write_xlsx(&empty).unwrap();
    for (api, file) in [
        ("/get_containers", "/files/containers.xlsx"),
        ("/get_appointments", "/files/appointments.xlsx"),
    ] {
        Mock::given(method("POST"))
            .and(path(api))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "file_url": format!("{}{}", server.uri(), file),
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(file))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.clone()))
            .mount(server)
            .await;
    }
}

async fn await_api_terminal(
    http: &reqwest::Client,
    base_url: &str,
    query_id: &str,
) -> serde_json::Value {
    for _ in 0..100 {
        let body: serde_json::Value = http
            .get(format!("{base_url}/queries/{query_id}"))
            .bearer_auth(TENANT_TOKEN)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let status = body["query"]["status"].as_str().unwrap_or_default().to_string();
        if status == "completed" || status == "failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    panic!("job {query_id} did not reach a terminal state via the API");
}

#[tokio::test]
async fn health_is_public_and_everything_else_is_not() {
    let upstream = MockServer::start().await;
    let gw = start_gateway(&upstream).await;
    let http = reqwest::Client::new();

    let health = http
        .get(format!("{}/health", gw.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
    let body: serde_json::Value = health.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    // No token: rejected.
    let unauthorized = http
        .get(format!("{}/queries", gw.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(unauthorized.status(), 401);

    // Wrong token: rejected.
    let wrong = http
        .get(format!("{}/queries", gw.base_url))
        .bearer_auth("not-the-token")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    // Admin without secret: rejected; with secret: allowed.
    let admin_unauth = http
        .get(format!("{}/admin/tenants", gw.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(admin_unauth.status(), 401);

    let admin = http
        .get(format!("{}/admin/tenants", gw.base_url))
        .header("x-admin-secret", ADMIN_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(admin.status(), 200);
    let body: serde_json::Value = admin.json().await.unwrap();
    assert_eq!(body["tenants"][0]["name"], "gw-tenant");

    gw.db.close().await.unwrap();
}

#[tokio::test]
async fn trigger_runs_job_and_serves_artifacts() {
    let upstream = MockServer::start().await;
    mount_empty_upstream(&upstream).await;
    let gw = start_gateway(&upstream).await;
    let http = reqwest::Client::new();

    // Trigger returns immediately with a pending job.
    let triggered: serde_json::Value = http
        .post(format!("{}/queries/trigger", gw.base_url))
        .bearer_auth(TENANT_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(triggered["success"], true);
    assert_eq!(triggered["status"], "pending");
    let query_id = triggered["query_id"].as_str().unwrap().to_string();

    let done = await_api_terminal(&http, &gw.base_url, &query_id).await;
    assert_eq!(done["query"]["status"], "completed");
    assert_eq!(done["query"]["summary_stats"]["totals_filtered"], 0);

    // The job shows up in the list.
    let list: serde_json::Value = http
        .get(format!("{}/queries?status=completed", gw.base_url))
        .bearer_auth(TENANT_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list["total"], 1);
    assert_eq!(list["queries"][0]["query_id"], query_id.as_str());

    // Master mirror download works after a run.
    let mirror = http
        .get(format!("{}/files/containers", gw.base_url))
        .bearer_auth(TENANT_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(mirror.status(), 200);

    // Spreadsheet metadata points at the job download route.
    let meta: serde_json::Value = http
        .get(format!(
            "{}/files/spreadsheets?kind=job_filtered&query_id={query_id}",
            gw.base_url
        ))
        .bearer_auth(TENANT_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(meta["filename"], "filtered_containers.xlsx");
    assert!(meta["size"].as_u64().unwrap() > 0);

    // The zip bundle contains the run's artifacts.
    let zip_bytes = http
        .get(format!("{}/queries/{query_id}/download", gw.base_url))
        .bearer_auth(TENANT_TOKEN)
        .send()
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes.to_vec())).unwrap();
    let names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert!(names.contains(&"all_containers.xlsx".to_string()), "got: {names:?}");

    gw.db.close().await.unwrap();
}

#[tokio::test]
async fn schedule_surface_round_trips() {
    let upstream = MockServer::start().await;
    let gw = start_gateway(&upstream).await;
    let http = reqwest::Client::new();

    let schedule: serde_json::Value = http
        .get(format!("{}/schedule", gw.base_url))
        .bearer_auth(TENANT_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(schedule["schedule"]["enabled"], true);
    assert_eq!(schedule["schedule"]["frequency"], 60);

    // Update frequency and disable in one call.
    let updated: serde_json::Value = http
        .put(format!("{}/schedule", gw.base_url))
        .bearer_auth(TENANT_TOKEN)
        .json(&serde_json::json!({"enabled": false, "frequency": 120}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["schedule"]["enabled"], false);
    assert_eq!(updated["schedule"]["frequency"], 120);

    // Zero frequency is rejected.
    let bad = http
        .put(format!("{}/schedule", gw.base_url))
        .bearer_auth(TENANT_TOKEN)
        .json(&serde_json::json!({"frequency": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 400);

    // Resume re-enables.
    let resumed = http
        .post(format!("{}/schedule/resume", gw.base_url))
        .bearer_auth(TENANT_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(resumed.status(), 200);

    let schedule: serde_json::Value = http
        .get(format!("{}/schedule", gw.base_url))
        .bearer_auth(TENANT_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(schedule["schedule"]["enabled"], true);
    assert_eq!(schedule["schedule"]["frequency"], 120);

    gw.db.close().await.unwrap();
}
