use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use snake_backend::api::{self, AppState};
use snake_backend::config::Config;
use snake_backend::leaderboard::Leaderboard;
use snake_backend::metrics;
use snake_backend::store::Store;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    metrics::register_metrics();

    let store = Store::open(&config.database_url, config.memory_store)
        .await
        .expect("Failed to open leaderboard store");
    let backend = store.backend_name();

    let leaderboard = Leaderboard::new(store)
        .with_key(config.leaderboard_key.clone())
        .with_timeout(config.store_timeout);

    let state = AppState {
        leaderboard: Arc::new(leaderboard),
        settings: Arc::new(config.game.clone()),
    };

    let mut app = api::router(state);
    if let Some(dir) = &config.static_dir {
        tracing::info!(dir = %dir.display(), "Serving static files");
        app = app.fallback_service(ServeDir::new(dir));
    }
    let app = app.layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to port {}: {e}", config.port));

    tracing::info!(
        port = config.port,
        store = backend,
        grid_width = config.game.width,
        grid_height = config.game.height,
        "Snake backend listening"
    );
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
