//! Stats collector against a stand-in GitHub API and dashboard.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use govboard_core::model::{IngestBatch, IngestReport};
use govboard_sources::collector::{CollectorConfig, StatsCollector};
use govboard_sources::github::GithubClient;
use govboard_sources::http::SourceError;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Clone, Default)]
struct Stub {
    remaining: u64,
    ingest_attempts: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<IngestBatch>>>,
}

async fn serve(stub: Stub) -> SocketAddr {
    let router = Router::new()
        .route(
            "/rate_limit",
            get(|State(stub): State<Stub>| async move {
                Json(json!({"resources": {"core": {"limit": 5000, "remaining": stub.remaining, "reset": 0}}}))
            }),
        )
        .route(
            "/repos/{owner}/{repo}/commits",
            get(|| async {
                Json(json!([
                    {"sha": "a1", "commit": {"author": {"name": "x", "date": "2024-01-01T00:00:00Z"}, "message": "one"}, "author": {"login": "x"}},
                    {"sha": "b2", "commit": {"author": null, "message": "two\nbody"}, "author": null}
                ]))
            }),
        )
        .route(
            "/repos/{owner}/{repo}/pulls",
            get(|| async {
                Json(json!([
                    {"number": 7, "title": "pr", "state": "closed", "user": {"login": "y"},
                     "created_at": "2024-01-02T00:00:00Z", "merged_at": "2024-01-03T00:00:00Z", "closed_at": "2024-01-03T00:00:00Z"}
                ]))
            }),
        )
        .route(
            "/repos/{owner}/{repo}/issues",
            get(|| async {
                Json(json!([
                    {"number": 7, "title": "pr", "state": "closed", "user": null, "created_at": "2024-01-02T00:00:00Z", "closed_at": null, "pull_request": {}},
                    {"number": 9, "title": "bug", "state": "open", "user": null, "created_at": "2024-01-04T00:00:00Z", "closed_at": null}
                ]))
            }),
        )
        .route(
            "/api/github/existing-ids",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q["repo"], "MeshJS/mesh");
                Json(json!({"commits": ["a1"], "pulls": [], "issues": []}))
            }),
        )
        .route(
            "/api/github/ingest",
            post(|State(stub): State<Stub>, Json(batch): Json<IngestBatch>| async move {
                if stub.ingest_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(StatusCode::BAD_GATEWAY);
                }
                let report = IngestReport {
                    commits: batch.commits.len() as u64,
                    pulls: batch.pulls.len() as u64,
                    issues: batch.issues.len() as u64,
                };
                stub.received.lock().unwrap().push(batch);
                Ok(Json(report))
            }),
        )
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn collector(addr: SocketAddr) -> StatsCollector {
    let github = GithubClient::with_api_url(format!("http://{addr}"), None).unwrap();
    let mut config = CollectorConfig::new(
        format!("http://{addr}/api/github/existing-ids"),
        format!("http://{addr}/api/github/ingest"),
    );
    config.retry_delay_ms = 10;
    config.batch_delay_ms = 0;
    config.batch_size = 1;
    StatsCollector::new(github, config, Some("token".into())).unwrap()
}

#[tokio::test]
async fn pushes_only_missing_items_and_retries_failed_batch() {
    let stub = Stub {
        remaining: 4000,
        ..Default::default()
    };
    let addr = serve(stub.clone()).await;

    let report = collector(addr).run("MeshJS/mesh").await.unwrap();

    assert_eq!(report.fetched_commits, 2);
    assert_eq!(report.fetched_issues, 1);
    assert_eq!(report.new_items, 3);
    assert_eq!(report.batches, 3);
    assert_eq!(report.ingested.commits, 1);
    assert_eq!(report.ingested.pulls, 1);
    assert_eq!(report.ingested.issues, 1);
    assert_eq!(stub.ingest_attempts.load(Ordering::SeqCst), 4);

    let received = stub.received.lock().unwrap();
    let shas: Vec<&str> = received
        .iter()
        .flat_map(|b| b.commits.iter().map(|c| c.sha.as_str()))
        .collect();
    assert_eq!(shas, vec!["b2"]);
}

#[tokio::test]
async fn aborts_when_rate_limit_is_low() {
    let stub = Stub {
        remaining: 5,
        ..Default::default()
    };
    let addr = serve(stub.clone()).await;

    let err = collector(addr).run("MeshJS/mesh").await.unwrap_err();
    assert!(matches!(err, SourceError::RateLimited { .. }));
    assert_eq!(stub.ingest_attempts.load(Ordering::SeqCst), 0);
}

#[test]
fn config_defaults_match_ingest_contract() {
    let config: CollectorConfig = serde_json::from_value(json!({
        "existing_ids_url": "http://localhost/ids",
        "ingest_url": "http://localhost/ingest"
    }))
    .unwrap();
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.retry_delay_ms, 2_000);
    let _: Value = serde_json::to_value(&config).unwrap();
}
