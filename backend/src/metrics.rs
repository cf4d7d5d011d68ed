// Prometheus metrics definitions for the snake backend.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Game sessions with a live driver task.
    pub static ref ACTIVE_SESSIONS: IntGauge =
        IntGauge::new("snake_active_sessions", "Game sessions currently open").unwrap();

    /// Live WebSocket connections.
    pub static ref CONNECTED_WEBSOCKETS: IntGauge =
        IntGauge::new("snake_connected_websockets", "Live WebSocket connections").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Rounds started across all sessions.
    pub static ref GAMES_STARTED_TOTAL: IntCounter =
        IntCounter::new("snake_games_started_total", "Rounds started").unwrap();

    /// Rounds ended, by reason (wall, self, board_filled).
    pub static ref GAMES_OVER_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snake_games_over_total", "Rounds ended"),
        &["reason"],
    )
    .unwrap();

    /// Simulation ticks processed.
    pub static ref TICKS_TOTAL: IntCounter =
        IntCounter::new("snake_ticks_total", "Simulation ticks processed").unwrap();

    /// Food items eaten.
    pub static ref FOOD_EATEN_TOTAL: IntCounter =
        IntCounter::new("snake_food_eaten_total", "Food items eaten").unwrap();

    /// Leaderboard submissions, by outcome (stored, invalid, failed).
    pub static ref LEADERBOARD_SUBMISSIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snake_leaderboard_submissions_total", "Leaderboard submissions"),
        &["outcome"],
    )
    .unwrap();

    /// Backing store failures, by operation (get, set).
    pub static ref STORE_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snake_store_errors_total", "Key-value store failures"),
        &["op"],
    )
    .unwrap();

    /// Total WebSocket messages sent to clients.
    pub static ref WEBSOCKET_MESSAGES_SENT_TOTAL: IntCounter = IntCounter::new(
        "snake_websocket_messages_sent_total",
        "Total WebSocket messages sent",
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("snake_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Score at the end of each round.
    pub static ref FINAL_SCORE: Histogram = Histogram::with_opts(
        HistogramOpts::new("snake_final_score", "Score when a round ends")
            .buckets(vec![0.0, 10.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2500.0]),
    )
    .unwrap();

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "snake_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0]),
        &["endpoint"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(ACTIVE_SESSIONS.clone()),
            Box::new(CONNECTED_WEBSOCKETS.clone()),
            Box::new(GAMES_STARTED_TOTAL.clone()),
            Box::new(GAMES_OVER_TOTAL.clone()),
            Box::new(TICKS_TOTAL.clone()),
            Box::new(FOOD_EATEN_TOTAL.clone()),
            Box::new(LEADERBOARD_SUBMISSIONS_TOTAL.clone()),
            Box::new(STORE_ERRORS_TOTAL.clone()),
            Box::new(WEBSOCKET_MESSAGES_SENT_TOTAL.clone()),
            Box::new(API_REQUESTS_TOTAL.clone()),
            Box::new(FINAL_SCORE.clone()),
            Box::new(API_REQUEST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            REGISTRY.register(c).expect("failed to register metric");
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice_does_not_panic() {
        register_metrics();
        register_metrics();
    }

    #[test]
    fn test_gather_metrics_contains_prefix() {
        register_metrics();
        TICKS_TOTAL.inc();
        let output = gather_metrics();
        assert!(output.contains("snake_ticks_total"));
    }

    #[test]
    fn test_metric_increments() {
        CONNECTED_WEBSOCKETS.inc();
        CONNECTED_WEBSOCKETS.dec();

        GAMES_STARTED_TOTAL.inc();
        GAMES_OVER_TOTAL.with_label_values(&["wall"]).inc();
        FOOD_EATEN_TOTAL.inc();
        LEADERBOARD_SUBMISSIONS_TOTAL
            .with_label_values(&["stored"])
            .inc();
        STORE_ERRORS_TOTAL.with_label_values(&["get"]).inc();
        FINAL_SCORE.observe(120.0);
        API_REQUEST_DURATION_SECONDS
            .with_label_values(&["/api/leaderboard"])
            .observe(0.05);
        API_REQUESTS_TOTAL
            .with_label_values(&["GET", "/api/leaderboard", "200"])
            .inc();
    }
}
