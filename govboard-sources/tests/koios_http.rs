//! Koios client against a local stand-in server.

use std::net::SocketAddr;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use govboard_core::ChainSource;
use govboard_sources::http::SourceError;
use govboard_sources::koios::KoiosClient;
use serde_json::{json, Value};
use std::collections::HashMap;

async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn router() -> Router {
    Router::new()
        .route(
            "/api/v1/tip",
            get(|headers: HeaderMap| async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer secret");
                if !authorized {
                    return Err(StatusCode::UNAUTHORIZED);
                }
                Ok(Json(json!([{
                    "hash": "abc",
                    "epoch_no": 540,
                    "abs_slot": 150000000,
                    "epoch_slot": 1200,
                    "block_no": 11000000,
                    "block_time": 1730000000
                }])))
            }),
        )
        .route(
            "/api/v1/totals",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let epoch: u32 = q.get("_epoch_no").and_then(|e| e.parse().ok()).unwrap_or(0);
                Json(json!([{ "epoch_no": epoch, "treasury": "1500000000000000" }]))
            }),
        )
        .route(
            "/api/v1/pool_list",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let offset: usize = q["offset"].parse().unwrap();
                let limit: usize = q["limit"].parse().unwrap();
                let pools: Vec<Value> = (0..3)
                    .skip(offset)
                    .take(limit)
                    .map(|i| json!({ "pool_id_bech32": format!("pool{i}"), "ticker": "T" }))
                    .collect();
                Json(Value::Array(pools))
            }),
        )
        .route(
            "/api/v1/pool_info",
            post(|Json(body): Json<Value>| async move {
                let ids = body["_pool_bech32_ids"].as_array().cloned().unwrap_or_default();
                let rows: Vec<Value> = ids
                    .iter()
                    .map(|id| json!({ "pool_id_bech32": id, "live_stake": "42" }))
                    .collect();
                Json(Value::Array(rows))
            }),
        )
        .route(
            "/api/v1/proposal_list",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "upstream down") }),
        )
}

#[tokio::test]
async fn decodes_tip_with_bearer_token() {
    let addr = serve(router()).await;
    let client = KoiosClient::new(format!("http://{addr}/api/v1"), Some("secret".into())).unwrap();

    let tip = client.tip().await.unwrap();
    assert_eq!(tip.epoch_no, 540);
    assert_eq!(tip.block_height, 11_000_000);

    let anonymous = KoiosClient::new(format!("http://{addr}/api/v1"), None).unwrap();
    let err = anonymous.fetch_tip().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn passes_epoch_filter_and_paging() {
    let addr = serve(router()).await;
    let client = KoiosClient::new(format!("http://{addr}/api/v1"), None).unwrap();

    let totals = client.fetch_totals(Some(512)).await.unwrap();
    assert_eq!(totals[0].epoch_no, 512);

    let page = client.fetch_pool_page(2, 10).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].pool_id_bech32, "pool2");

    let details = client
        .fetch_pool_info(&["pool0".to_string(), "pool1".to_string()])
        .await
        .unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[1].live_stake.as_deref(), Some("42"));
}

#[tokio::test]
async fn server_errors_are_retryable() {
    let addr = serve(router()).await;
    let client = KoiosClient::new(format!("http://{addr}/api/v1"), None).unwrap();

    let err = client.fetch_proposals().await.unwrap_err();
    assert!(matches!(err, SourceError::Status { status: 503, .. }));
    assert!(err.is_retryable());

    let sync_err = client.proposals().await.unwrap_err();
    assert!(sync_err.is_retryable());
}
