//! Integration tests for the HTTP collaborators against in-process mock
//! servers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tempfile::TempDir;

use runner_agent::agent::{Agent, AgentError};
use runner_agent::config::{AgentConfig, MetadataPolicy};
use runner_agent::controller::{ControllerClient, ControllerError, Endpoint, ReportSink};
use runner_agent::metadata::{
    collect_instance, ImdsClient, MetadataError, MetadataKey, MetadataProvider, TOKEN_HEADER,
    TOKEN_TTL_HEADER,
};
use runner_agent::models::{Instance, Job, MemoryLog};

const TOKEN: &str = "AQAEAExampleToken==";

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}")
}

// Controller mock

#[derive(Debug, Clone)]
struct Received {
    path: &'static str,
    authorization: Option<String>,
    body: Value,
}

#[derive(Default)]
struct ControllerMock {
    received: Mutex<Vec<Received>>,
    reject_jobs: bool,
}

impl ControllerMock {
    fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    fn record(&self, path: &'static str, headers: &HeaderMap, body: Value) {
        let authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.received.lock().unwrap().push(Received {
            path,
            authorization,
            body,
        });
    }
}

async fn post_instance(
    State(mock): State<Arc<ControllerMock>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    mock.record("instances", &headers, body);
    StatusCode::CREATED
}

async fn post_job(
    State(mock): State<Arc<ControllerMock>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    mock.record("jobs", &headers, body);
    if mock.reject_jobs {
        (StatusCode::BAD_REQUEST, "workflow is required".to_string())
    } else {
        (StatusCode::CREATED, String::new())
    }
}

async fn post_memory_log(
    State(mock): State<Arc<ControllerMock>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    mock.record("memorylogs", &headers, body);
    // Any 2xx counts as accepted.
    StatusCode::OK
}

async fn controller_mock(reject_jobs: bool) -> (String, Arc<ControllerMock>) {
    let mock = Arc::new(ControllerMock {
        reject_jobs,
        ..ControllerMock::default()
    });
    let router = Router::new()
        .route("/api/instances", post(post_instance))
        .route("/api/jobs", post(post_job))
        .route("/api/memorylogs", post(post_memory_log))
        .with_state(Arc::clone(&mock));
    let base = serve(router).await;
    (format!("{base}/api"), mock)
}

fn controller_client(base_url: &str) -> ControllerClient {
    ControllerClient::new(
        base_url,
        "secret",
        Duration::from_secs(5),
        Duration::from_secs(5),
    )
    .expect("Failed to build controller client")
}

// Metadata mock

#[derive(Default)]
struct ImdsMock {
    ttl_headers: Mutex<Vec<String>>,
}

async fn put_token(State(mock): State<Arc<ImdsMock>>, headers: HeaderMap) -> (StatusCode, String) {
    match headers.get(TOKEN_TTL_HEADER).and_then(|v| v.to_str().ok()) {
        Some(ttl) => {
            mock.ttl_headers.lock().unwrap().push(ttl.to_string());
            (StatusCode::OK, TOKEN.to_string())
        }
        None => (StatusCode::BAD_REQUEST, String::new()),
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok()) == Some(TOKEN)
}

fn metadata_value(headers: &HeaderMap, value: &str) -> (StatusCode, String) {
    if authorized(headers) {
        (StatusCode::OK, value.to_string())
    } else {
        (StatusCode::UNAUTHORIZED, String::new())
    }
}

async fn imds_mock(with_local_ipv4: bool) -> (String, Arc<ImdsMock>) {
    let mock = Arc::new(ImdsMock::default());
    let mut router = Router::new()
        .route("/latest/api/token", put(put_token))
        .route(
            "/latest/meta-data/instance-id",
            get(|headers: HeaderMap| async move { metadata_value(&headers, "i-0abc123") }),
        )
        .route(
            "/latest/meta-data/instance-type",
            get(|headers: HeaderMap| async move { metadata_value(&headers, "m5.large") }),
        )
        .route(
            "/latest/meta-data/placement/availability-zone",
            get(|headers: HeaderMap| async move { metadata_value(&headers, "us-east-1a") }),
        );
    if with_local_ipv4 {
        router = router.route(
            "/latest/meta-data/local-ipv4",
            get(|headers: HeaderMap| async move { metadata_value(&headers, "10.0.0.12\n") }),
        );
    }
    let base = serve(router.with_state(Arc::clone(&mock))).await;
    (base, mock)
}

fn imds_client(endpoint: &str) -> ImdsClient {
    ImdsClient::new(endpoint, 21600, Duration::from_secs(5)).expect("Failed to build IMDS client")
}

fn write_worker_log(dir: &std::path::Path, name: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join(name),
        "[2024-01-01 10:00:00Z INFO Worker] Job message:\n\
         \"v\": \"https://api.github.com/repos/acme/widgets\"\n\
         \"v\": \"acme/widgets/.github/workflows/build-and-test\"\n\
         [2024-01-01 10:05:30Z INFO Worker] Job completed.\n",
    )
    .unwrap();
}

#[tokio::test]
async fn test_controller_posts_job_with_token() {
    let (base, mock) = controller_mock(false).await;
    let client = controller_client(&base);

    let job = Job {
        instance_id: "i-0abc123".to_string(),
        organization: "acme".to_string(),
        repository: "widgets".to_string(),
        workflow: "build-and-test".to_string(),
        start_time: Some(Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()),
        end_time: None,
    };
    client.report_job(&job).await.unwrap();

    let received = mock.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "jobs");
    assert_eq!(received[0].authorization.as_deref(), Some("Token secret"));
    assert_eq!(received[0].body["organization"], "acme");
    assert_eq!(received[0].body["workflow"], "build-and-test");
    assert_eq!(received[0].body["start_time"], "2024-01-01T10:00:00Z");
    assert!(received[0].body["end_time"].is_null());
}

#[tokio::test]
async fn test_controller_posts_instance_and_memory_log() {
    let (base, mock) = controller_mock(false).await;
    let client = controller_client(&base);

    let instance = Instance {
        instance_id: "i-0abc123".to_string(),
        instance_type: "m5.large".to_string(),
        availability_zone: "us-east-1a".to_string(),
        private_ip_address: "10.0.0.12".to_string(),
        last_seen_at: Utc::now(),
    };
    client.report_instance(&instance).await.unwrap();

    let log = MemoryLog {
        instance_id: "i-0abc123".to_string(),
        total: 7821,
        used: 1204,
        free: 5012,
        timestamp: Utc::now(),
    };
    client.report_memory_log(&log).await.unwrap();

    let received = mock.received();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].path, "instances");
    assert_eq!(received[0].body["type"], "m5.large");
    assert_eq!(received[1].path, "memorylogs");
    assert_eq!(received[1].body["used"], 1204);
}

#[tokio::test]
async fn test_controller_rejection_surfaces_status_and_body() {
    let (base, _mock) = controller_mock(true).await;
    let client = controller_client(&base);

    let err = client.report_job(&Job::default()).await.unwrap_err();
    match err {
        ControllerError::Status {
            endpoint,
            status,
            body,
        } => {
            assert_eq!(endpoint, Endpoint::Jobs);
            assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
            assert_eq!(body, "workflow is required");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_controller_unknown_route_is_an_error() {
    let (base, _mock) = controller_mock(false).await;
    // Wrong base path: every endpoint 404s.
    let client = controller_client(base.trim_end_matches("/api"));

    let err = client.report_job(&Job::default()).await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Status {
            status: reqwest::StatusCode::NOT_FOUND,
            ..
        }
    ));
}

#[tokio::test]
async fn test_imds_collects_instance() {
    let (endpoint, mock) = imds_mock(true).await;
    let client = imds_client(&endpoint);

    let instance = collect_instance(&client).await.unwrap();
    assert_eq!(instance.instance_id, "i-0abc123");
    assert_eq!(instance.instance_type, "m5.large");
    assert_eq!(instance.availability_zone, "us-east-1a");
    assert_eq!(instance.private_ip_address, "10.0.0.12");
    assert_eq!(*mock.ttl_headers.lock().unwrap(), vec!["21600".to_string()]);
}

#[tokio::test]
async fn test_imds_rejects_wrong_token() {
    let (endpoint, _mock) = imds_mock(true).await;
    let client = imds_client(&endpoint);

    let err = client
        .fetch("not-the-token", MetadataKey::InstanceId)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MetadataError::Status {
            target: "instance-id",
            status: reqwest::StatusCode::UNAUTHORIZED,
        }
    ));
}

#[tokio::test]
async fn test_imds_missing_key_fails_collection() {
    let (endpoint, _mock) = imds_mock(false).await;
    let client = imds_client(&endpoint);

    let err = collect_instance(&client).await.unwrap_err();
    assert!(matches!(
        err,
        MetadataError::Status {
            target: "local-ipv4",
            status: reqwest::StatusCode::NOT_FOUND,
        }
    ));
}

fn agent_config(root: &std::path::Path, controller: &str, imds: &str) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.monitor.root = root.to_path_buf();
    config.monitor.instance_heartbeat = true;
    config.controller.url = Some(controller.to_string());
    config.controller.token = Some("secret".to_string());
    config.metadata.endpoint = imds.to_string();
    config
}

#[tokio::test]
async fn test_agent_run_once_end_to_end() {
    let (controller, mock) = controller_mock(false).await;
    let (imds, _imds_mock) = imds_mock(true).await;
    let temp_dir = TempDir::new().unwrap();
    write_worker_log(&temp_dir.path().join("_diag"), "Worker_20240101-100000-utc.log");

    let agent = Agent::from_config(agent_config(temp_dir.path(), &controller, &imds)).unwrap();
    let report = agent.run_once().await.unwrap();

    // Job plus heartbeat.
    assert_eq!(report.reported, 2);
    assert!(report.is_clean());

    let received = mock.received();
    let paths: Vec<_> = received.iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["instances", "jobs", "instances"]);

    let job = &received[1].body;
    assert_eq!(job["instance_id"], "i-0abc123");
    assert_eq!(job["organization"], "acme");
    assert_eq!(job["repository"], "widgets");
    assert_eq!(job["workflow"], "build-and-test");
    assert_eq!(job["start_time"], "2024-01-01T10:00:00Z");
    assert_eq!(job["end_time"], "2024-01-01T10:05:30Z");
}

#[tokio::test]
async fn test_agent_strict_metadata_failure() {
    let (controller, mock) = controller_mock(false).await;
    let (imds, _imds_mock) = imds_mock(false).await;
    let temp_dir = TempDir::new().unwrap();

    let mut config = agent_config(temp_dir.path(), &controller, &imds);
    config.metadata.policy = MetadataPolicy::Strict;

    let agent = Agent::from_config(config).unwrap();
    let result = agent.run_once().await;
    assert!(matches!(result, Err(AgentError::Metadata(_))));
    assert!(mock.received().is_empty());
}

#[tokio::test]
async fn test_agent_tolerant_metadata_failure() {
    let (controller, mock) = controller_mock(false).await;
    let (imds, _imds_mock) = imds_mock(false).await;
    let temp_dir = TempDir::new().unwrap();
    write_worker_log(temp_dir.path(), "Worker_1.log");

    let agent = Agent::from_config(agent_config(temp_dir.path(), &controller, &imds)).unwrap();
    let report = agent.run_once().await.unwrap();
    assert_eq!(report.reported, 1);

    let received = mock.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, "jobs");
    assert_eq!(received[0].body["instance_id"], "");
}
