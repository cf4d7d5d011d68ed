// HTTP API routes (leaderboard, game settings, health, metrics).

pub mod ws;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Json, MatchedPath, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::engine::{GameSettings, SharedLeaderboard};
use crate::leaderboard::LeaderboardError;
use crate::metrics;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SubmitScoreRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// Kept loose so a wrong type reads as a validation error, not a parse error.
    #[serde(default)]
    pub score: Option<Value>,
}

#[derive(Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<usize>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub leaderboard: SharedLeaderboard,
    pub settings: Arc<GameSettings>,
}

// ── Error helper ──────────────────────────────────────────────────────

fn json_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

impl IntoResponse for LeaderboardError {
    fn into_response(self) -> Response {
        match self {
            LeaderboardError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, &msg),
            LeaderboardError::StoreUnavailable(_) => json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "Leaderboard is temporarily unavailable",
            ),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route(
            "/api/leaderboard",
            get(list_leaderboard).post(submit_score),
        )
        .route("/api/game/settings", get(game_settings))
        .route("/ws/game", get(ws::ws_game))
        .route_layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Count and time every matched request.
async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    let response = next.run(req).await;

    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[&endpoint])
        .observe(start.elapsed().as_secs_f64());
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[&method, &endpoint, response.status().as_str()])
        .inc();
    response
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "snake-backend" }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

async fn game_settings(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.settings.as_ref().clone()))
}

async fn list_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Response {
    match state.leaderboard.list_top(params.limit).await {
        Ok(entries) => (StatusCode::OK, Json(json!(entries))).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn submit_score(
    State(state): State<AppState>,
    payload: Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(rejection) => {
            tracing::debug!("Rejected leaderboard body: {rejection}");
            return json_error(StatusCode::BAD_REQUEST, "Invalid data");
        }
    };

    let name = req.name.unwrap_or_default();
    // Non-integers, strings, and missing scores all fail the positivity check
    let score = req.score.as_ref().and_then(Value::as_i64).unwrap_or(0);

    match state.leaderboard.submit(&name, score).await {
        Ok(entry) => (StatusCode::CREATED, Json(json!(entry))).into_response(),
        Err(e) => e.into_response(),
    }
}
