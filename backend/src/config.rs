// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::engine::GameSettings;
use crate::leaderboard::{DEFAULT_LEADERBOARD_KEY, DEFAULT_STORE_TIMEOUT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("invalid game settings: {0}")]
    InvalidGame(String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string for the leaderboard store.
    pub database_url: String,
    /// Keep the leaderboard in memory instead of SQLite.
    pub memory_store: bool,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Key holding the leaderboard record.
    pub leaderboard_key: String,
    /// Upper bound on a single store call.
    pub store_timeout: Duration,
    /// Directory containing pre-built frontend files to serve.
    /// When set, the backend serves static files from this path.
    pub static_dir: Option<PathBuf>,
    /// Settings used for every new game session.
    pub game: GameSettings,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:snake.db?mode=rwc`)
    /// - `SNAKE_MEMORY_STORE` - `true`/`1` keeps the leaderboard in memory
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `LEADERBOARD_KEY` - store key for the leaderboard (default: `leaderboard`)
    /// - `STORE_TIMEOUT_MS` - per-call store timeout (default: 5000)
    /// - `STATIC_DIR` - Path to frontend dist directory for static file serving
    /// - `GRID_WIDTH`, `GRID_HEIGHT` - board size (default: 30x20)
    ///
    /// CLI flags:
    /// - `--memory` - same as `SNAKE_MEMORY_STORE=true`
    /// - `--port <PORT>` - Override the port
    pub fn load() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |name| std::env::var(name).ok())
    }

    /// Build a config from explicit arguments and an environment lookup.
    pub fn from_sources(
        args: &[String],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let database_url =
            env("DATABASE_URL").unwrap_or_else(|| "sqlite:snake.db?mode=rwc".to_string());

        let memory_store = args.iter().any(|a| a == "--memory")
            || env("SNAKE_MEMORY_STORE")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false);

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = match Self::parse_cli_value(args, "--port") {
            Some(v) => parse_value("--port", v)?,
            None => match env("PORT") {
                Some(v) => parse_value("PORT", v)?,
                None => 3000,
            },
        };

        let leaderboard_key =
            env("LEADERBOARD_KEY").unwrap_or_else(|| DEFAULT_LEADERBOARD_KEY.to_string());

        let store_timeout = match env("STORE_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(parse_value("STORE_TIMEOUT_MS", v)?),
            None => DEFAULT_STORE_TIMEOUT,
        };

        let static_dir = env("STATIC_DIR").map(PathBuf::from);

        let defaults = GameSettings::default();
        let width = match env("GRID_WIDTH") {
            Some(v) => parse_value("GRID_WIDTH", v)?,
            None => defaults.width,
        };
        let height = match env("GRID_HEIGHT") {
            Some(v) => parse_value("GRID_HEIGHT", v)?,
            None => defaults.height,
        };
        let game = if (width, height) == (defaults.width, defaults.height) {
            defaults
        } else {
            GameSettings::with_grid(width, height)
        };
        game.validate().map_err(ConfigError::InvalidGame)?;

        Ok(Config {
            database_url,
            memory_store,
            port,
            leaderboard_key,
            store_timeout,
            static_dir,
            game,
        })
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value })
}
