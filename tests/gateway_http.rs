//! Client and poller against an in-process fake gateway.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use swarm_topology::types::DeployRequest;
use swarm_topology::{
    ClusterMonitor, ClusterSession, FetchError, GatewayClient, GatewayConfig, Poller,
    UserActionError,
};

#[derive(Clone, Default)]
struct FakeGateway {
    graph_calls: Arc<AtomicUsize>,
    graph_delay: Duration,
    graph_status: Option<StatusCode>,
    graph_body: Arc<Mutex<String>>,
    deploy_status: Option<StatusCode>,
    last_deploy: Arc<Mutex<Option<Value>>>,
    last_invoke: Arc<Mutex<Option<(String, Value)>>>,
}

fn graph_json(ids: &[&str]) -> String {
    let nodes: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "name": id, "region": "us", "lastSeenAtMs": 1}))
        .collect();
    json!({
        "clusterId": "swarm-test",
        "gateway": {"id": "g", "name": "gateway", "region": "us"},
        "nodes": nodes,
        "functions": [{"name": "hello", "latestVersion": "1"}],
        "capturedAtMs": 1000
    })
    .to_string()
}

async fn graph(State(gw): State<FakeGateway>) -> impl IntoResponse {
    gw.graph_calls.fetch_add(1, Ordering::SeqCst);
    if !gw.graph_delay.is_zero() {
        tokio::time::sleep(gw.graph_delay).await;
    }
    let body = gw.graph_body.lock().unwrap().clone();
    (gw.graph_status.unwrap_or(StatusCode::OK), body)
}

async fn deploy(State(gw): State<FakeGateway>, Json(body): Json<Value>) -> impl IntoResponse {
    *gw.last_deploy.lock().unwrap() = Some(body);
    match gw.deploy_status {
        Some(status) => (status, "missing handler".to_string()),
        None => (StatusCode::CREATED, r#"{"version":"1"}"#.to_string()),
    }
}

async fn invoke(
    State(gw): State<FakeGateway>,
    Path(name): Path<String>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    *gw.last_invoke.lock().unwrap() = Some((name.clone(), payload.clone()));
    if name == "missing" {
        return (StatusCode::NOT_FOUND, "no such function".to_string());
    }
    (
        StatusCode::OK,
        json!({"greeting": format!("hi {}", payload["name"].as_str().unwrap_or("?"))}).to_string(),
    )
}

/// Serve `gw` on an ephemeral port and return its base URL.
async fn serve(gw: FakeGateway) -> String {
    let app = Router::new()
        .route("/graph", get(graph))
        .route("/functions", post(deploy))
        .route("/2015-03-31/functions/:name/invocations", post(invoke))
        .with_state(gw);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base: &str) -> GatewayClient {
    GatewayClient::new(base, Duration::from_secs(2)).unwrap()
}

fn gateway_with(body: String) -> FakeGateway {
    FakeGateway {
        graph_body: Arc::new(Mutex::new(body)),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fetch_snapshot_ok() {
    let base = serve(gateway_with(graph_json(&["g", "w1", "w2"]))).await;
    let snapshot = client(&base).fetch_snapshot().await.unwrap();

    assert_eq!(snapshot.cluster_id, "swarm-test");
    assert_eq!(snapshot.nodes.len(), 3);
    assert_eq!(snapshot.gateway_id(), Some("g"));
    assert_eq!(snapshot.functions[0].name, "hello");
}

#[tokio::test]
async fn test_fetch_snapshot_malformed() {
    let base = serve(gateway_with(r#"{"clusterId": "x", "nodes": "nope"}"#.into())).await;
    let err = client(&base).fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, FetchError::Malformed { .. }), "{:?}", err);

    let base = serve(gateway_with("<html>oops</html>".into())).await;
    let err = client(&base).fetch_snapshot().await.unwrap_err();
    assert!(matches!(err, FetchError::Malformed { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_fetch_snapshot_server_error_is_unreachable() {
    let gw = FakeGateway {
        graph_status: Some(StatusCode::INTERNAL_SERVER_ERROR),
        ..gateway_with(graph_json(&["g"]))
    };
    let base = serve(gw).await;
    let err = client(&base).fetch_snapshot().await.unwrap_err();
    match err {
        FetchError::Unreachable { url, reason } => {
            assert!(url.ends_with("/graph"));
            assert!(reason.contains("500"));
        }
        other => panic!("expected unreachable, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_snapshot_connection_refused() {
    // Bind then drop to get a port nobody listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{}", addr))
        .fetch_snapshot()
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Unreachable { .. }));
}

#[tokio::test]
async fn test_poller_follows_gateway_changes() {
    let gw = gateway_with(graph_json(&["g", "w1"]));
    let body = gw.graph_body.clone();
    let base = serve(gw).await;

    let monitor = ClusterMonitor::default();
    let handle = Poller::new(
        Arc::new(client(&base)),
        monitor.clone(),
        Duration::from_millis(50),
    )
    .spawn();

    let mut rx = monitor.subscribe();
    rx.changed().await.unwrap();
    let first = monitor.graph().await;
    assert_eq!(first.nodes.len(), 2);
    let w1_home = first.node("w1").unwrap().position;

    *body.lock().unwrap() = graph_json(&["w2", "w1", "g"]);
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.unwrap();
            if monitor.graph().await.node("w2").is_some() {
                break;
            }
        }
    })
    .await
    .unwrap();

    handle.stop().await;

    let graph = monitor.graph().await;
    assert_eq!(graph.node("w1").unwrap().position, w1_home);
    assert_eq!(graph.edges.len(), 2);
    assert_eq!(monitor.view().await.cluster_id.as_deref(), Some("swarm-test"));
}

#[tokio::test]
async fn test_stop_while_request_in_flight() {
    let gw = FakeGateway {
        graph_delay: Duration::from_millis(800),
        ..gateway_with(graph_json(&["g", "w1"]))
    };
    let calls = gw.graph_calls.clone();
    let base = serve(gw).await;

    let monitor = ClusterMonitor::default();
    let handle = Poller::new(
        Arc::new(client(&base)),
        monitor.clone(),
        Duration::from_secs(60),
    )
    .spawn();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    handle.stop().await;

    tokio::time::sleep(Duration::from_millis(1000)).await;
    let view = monitor.view().await;
    assert_eq!(view.revision, 0);
    assert!(view.graph.is_empty());
}

#[tokio::test]
async fn test_deploy_sends_files_and_runtime() {
    let gw = FakeGateway::default();
    let received = gw.last_deploy.clone();
    let base = serve(gw).await;

    let request = DeployRequest::new("hello", "index.handler")
        .with_file("index.js", "exports.handler = async () => 'hi';");
    client(&base).deploy(&request).await.unwrap();

    let body = received.lock().unwrap().clone().unwrap();
    assert_eq!(body["name"], "hello");
    assert_eq!(body["handler"], "index.handler");
    assert_eq!(body["runtime"], "nodejs20.x");
    assert_eq!(
        body["files"]["index.js"],
        "exports.handler = async () => 'hi';"
    );
}

#[tokio::test]
async fn test_deploy_rejected_keeps_status_and_body() {
    let gw = FakeGateway {
        deploy_status: Some(StatusCode::BAD_REQUEST),
        ..Default::default()
    };
    let base = serve(gw).await;

    let err = client(&base)
        .deploy(&DeployRequest::new("hello", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, UserActionError::Rejected { status: 400, .. }));
    assert_eq!(err.to_string(), "Deploy failed (400):\nmissing handler");
}

#[tokio::test]
async fn test_invoke_round_trip() {
    let gw = FakeGateway::default();
    let seen = gw.last_invoke.clone();
    let base = serve(gw).await;

    let response = client(&base)
        .invoke("hello world", &json!({"name": "ada"}))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.json.unwrap()["greeting"], "hi ada");

    let (name, payload) = seen.lock().unwrap().clone().unwrap();
    assert_eq!(name, "hello world");
    assert_eq!(payload["name"], "ada");
}

#[tokio::test]
async fn test_invoke_rejected_and_bad_payload() {
    let base = serve(FakeGateway::default()).await;
    let client = client(&base);

    let err = client.invoke("missing", &json!({})).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Invoke failed (404):\nno such function");

    let err = client.invoke_text("hello", "{not json").await.unwrap_err();
    assert!(matches!(err, UserActionError::InvalidPayload(_)));
}

fn session_config(base: &str) -> GatewayConfig {
    GatewayConfig::default()
        .with_base_url(base)
        .unwrap()
        .poll_interval(Duration::from_secs(60))
        .unwrap()
}

#[tokio::test]
async fn test_session_deploy_repolls_graph() {
    let gw = gateway_with(graph_json(&["g", "w1"]));
    let calls = gw.graph_calls.clone();
    let base = serve(gw).await;

    let session = ClusterSession::start(&session_config(&base)).unwrap();
    let mut rx = session.monitor().subscribe();
    rx.changed().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let view = session
        .deploy(&DeployRequest::new("hello", "index.handler"))
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(view.reachable);
    assert_eq!(view.functions[0].name, "hello");
    assert_eq!(session.monitor().applied_seq().await, 2);

    session.stop().await;
}

#[tokio::test]
async fn test_session_failed_deploy_does_not_repoll() {
    let gw = FakeGateway {
        deploy_status: Some(StatusCode::CONFLICT),
        ..gateway_with(graph_json(&["g"]))
    };
    let calls = gw.graph_calls.clone();
    let base = serve(gw).await;

    let session = ClusterSession::start(&session_config(&base)).unwrap();
    let mut rx = session.monitor().subscribe();
    rx.changed().await.unwrap();

    let err = session
        .deploy(&DeployRequest::new("hello", "index.handler"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(409));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    session.stop().await;
}

#[tokio::test]
async fn test_session_invoke_returns_body_verbatim_and_repolls() {
    let gw = gateway_with(graph_json(&["g"]));
    let calls = gw.graph_calls.clone();
    let base = serve(gw).await;

    let session = ClusterSession::start(&session_config(&base)).unwrap();
    let mut rx = session.monitor().subscribe();
    rx.changed().await.unwrap();

    let response = session
        .invoke_text("hello", r#"{"name": "ada"}"#)
        .await
        .unwrap();
    assert_eq!(response.body, r#"{"greeting":"hi ada"}"#);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    session.stop().await;
}

#[tokio::test]
async fn test_session_retarget_replaces_cluster() {
    let first = serve(gateway_with(graph_json(&["g", "w1"]))).await;
    let second = serve(gateway_with(graph_json(&["h", "w7"]))).await;

    let mut session = ClusterSession::start(&session_config(&first)).unwrap();
    let mut rx = session.monitor().subscribe();
    rx.changed().await.unwrap();
    assert!(session.monitor().graph().await.node("w1").is_some());

    session.retarget(&second).unwrap();
    assert_eq!(session.base_url(), second);

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.unwrap();
            if session.monitor().graph().await.node("w7").is_some() {
                break;
            }
        }
    })
    .await
    .unwrap();

    let graph = session.monitor().graph().await;
    assert!(graph.node("w1").is_none());
    assert!(graph.node("g").is_none());
    assert_eq!(graph.center_id.as_deref(), Some("g"));

    assert!(session.retarget("ftp://nowhere").is_err());
    session.stop().await;
}
