// Integration tests for the HTTP leaderboard endpoints, driven through the
// router with tower's oneshot (no network).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use snake_backend::api::{self, AppState};
use snake_backend::engine::GameSettings;
use snake_backend::leaderboard::Leaderboard;
use snake_backend::store::{KeyValueStore, MemoryStore, Store};

fn app_with(store: Store) -> Router {
    let state = AppState {
        leaderboard: Arc::new(Leaderboard::new(store)),
        settings: Arc::new(GameSettings::default()),
    };
    api::router(state)
}

fn app() -> Router {
    app_with(Store::Memory(MemoryStore::new()))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_raw(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_empty_leaderboard_is_empty_array() {
    let (status, body) = send(&app(), get("/api/leaderboard")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_submit_then_list() {
    let app = app();
    let (status, entry) = send(
        &app,
        post_json("/api/leaderboard", json!({ "name": "Bob", "score": 120 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["name"], "Bob");
    assert_eq!(entry["score"], 120);
    assert!(entry["date"].is_string());

    let (status, list) = send(&app, get("/api/leaderboard")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["score"], 120);
    assert_eq!(list[0]["name"], "Bob");
}

#[tokio::test]
async fn test_list_sorted_for_any_submission_order() {
    let app = app();
    for (name, score) in [("c", 30), ("a", 500), ("d", 10), ("b", 120)] {
        let (status, _) = send(
            &app,
            post_json("/api/leaderboard", json!({ "name": name, "score": score })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, list) = send(&app, get("/api/leaderboard")).await;
    let scores: Vec<i64> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["score"].as_i64().unwrap())
        .collect();
    assert_eq!(scores, vec![500, 120, 30, 10]);

    let (_, top2) = send(&app, get("/api/leaderboard?limit=2")).await;
    assert_eq!(top2.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_submissions_are_400_and_do_not_write() {
    let app = app();
    let bad_bodies = [
        json!({ "name": "", "score": 50 }),
        json!({ "name": "   ", "score": 50 }),
        json!({ "name": "Ana", "score": 0 }),
        json!({ "name": "Ana", "score": -5 }),
        json!({ "name": "Ana", "score": "50" }),
        json!({ "name": "Ana", "score": 12.5 }),
        json!({ "score": 50 }),
        json!({ "name": "Ana" }),
    ];
    for body in bad_bodies {
        let (status, resp) = send(&app, post_json("/api/leaderboard", body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body} should be rejected");
        assert!(resp["error"].is_string());
    }

    let (_, list) = send(&app, get("/api/leaderboard")).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (status, body) = send(&app(), post_raw("/api/leaderboard", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid data");
}

#[tokio::test]
async fn test_name_trimmed_and_truncated() {
    let (status, entry) = send(
        &app(),
        post_json(
            "/api/leaderboard",
            json!({ "name": "   A very long player name indeed   ", "score": 10 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let name = entry["name"].as_str().unwrap();
    assert!(name.chars().count() <= 20);
    assert!(name.starts_with("A very long"));
}

#[tokio::test]
async fn test_corrupt_store_is_503() {
    let store = MemoryStore::new();
    store.set("leaderboard", "{oops".into()).await.unwrap();
    let app = app_with(Store::Memory(store));

    let (status, body) = send(&app, get("/api/leaderboard")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        post_json("/api/leaderboard", json!({ "name": "Ana", "score": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_sqlite_backed_round_trip() {
    let store = Store::open("sqlite::memory:", false).await.unwrap();
    let app = app_with(store);
    send(
        &app,
        post_json("/api/leaderboard", json!({ "name": "Ana", "score": 40 })),
    )
    .await;
    send(
        &app,
        post_json("/api/leaderboard", json!({ "name": "Bob", "score": 90 })),
    )
    .await;
    let (_, list) = send(&app, get("/api/leaderboard")).await;
    assert_eq!(list[0]["name"], "Bob");
    assert_eq!(list[1]["name"], "Ana");
}

#[tokio::test]
async fn test_game_settings_endpoint() {
    let (status, body) = send(&app(), get("/api/game/settings")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["width"], 30);
    assert_eq!(body["height"], 20);
    assert_eq!(body["origin"], json!({ "x": 15, "y": 10 }));
    assert_eq!(body["initial_direction"], "RIGHT");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    snake_backend::metrics::register_metrics();
    let app = app();
    send(&app, get("/health")).await;
    let resp = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("snake_api_requests_total"));
}
