pub mod api;
pub mod config;
pub mod engine;
pub mod leaderboard;
pub mod metrics;
pub mod store;
