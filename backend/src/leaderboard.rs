// Global high-score leaderboard stored as a single JSON record in a key-value store.
//
// Every write reads the whole list, appends, re-sorts, and writes it back.
// There is no compare-and-swap: concurrent submissions can overwrite each
// other (last write wins at the collection level).

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics;
use crate::store::{KeyValueStore, StoreError};

pub const DEFAULT_LEADERBOARD_KEY: &str = "leaderboard";
pub const MAX_NAME_CHARS: usize = 20;
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// One submitted score. Never modified once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u32,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum LeaderboardError {
    /// The submission was rejected; nothing was written.
    #[error("invalid submission: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

/// Read/append access to the leaderboard record.
pub struct Leaderboard<S> {
    store: S,
    key: String,
    timeout: Duration,
}

impl<S: KeyValueStore> Leaderboard<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            key: DEFAULT_LEADERBOARD_KEY.to_string(),
            timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// All entries, highest score first. An empty store yields an empty list.
    /// `limit` truncates after sorting.
    pub async fn list_top(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        let mut entries = self.load().await.inspect_err(|e| {
            metrics::STORE_ERRORS_TOTAL.with_label_values(&["get"]).inc();
            tracing::warn!(key = %self.key, "Failed to read leaderboard: {e}");
        })?;
        sort_by_score(&mut entries);
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    /// Validate and append a score, returning the stored entry.
    pub async fn submit(
        &self,
        name: &str,
        score: i64,
    ) -> Result<LeaderboardEntry, LeaderboardError> {
        let (name, score) = match validate_submission(name, score) {
            Ok(valid) => valid,
            Err(e) => {
                metrics::LEADERBOARD_SUBMISSIONS_TOTAL
                    .with_label_values(&["invalid"])
                    .inc();
                return Err(e);
            }
        };

        let result = self.append(name, score).await;
        let outcome = if result.is_ok() { "stored" } else { "failed" };
        metrics::LEADERBOARD_SUBMISSIONS_TOTAL
            .with_label_values(&[outcome])
            .inc();
        result
    }

    async fn append(&self, name: String, score: u32) -> Result<LeaderboardEntry, LeaderboardError> {
        let mut entries = self.load().await.inspect_err(|e| {
            metrics::STORE_ERRORS_TOTAL.with_label_values(&["get"]).inc();
            tracing::warn!(key = %self.key, "Failed to read leaderboard before submit: {e}");
        })?;

        let entry = LeaderboardEntry {
            name,
            score,
            date: Utc::now(),
        };
        entries.push(entry.clone());
        sort_by_score(&mut entries);

        let json = serde_json::to_string(&entries).map_err(StoreError::from)?;
        bounded(self.timeout, self.store.set(&self.key, json))
            .await
            .inspect_err(|e| {
                metrics::STORE_ERRORS_TOTAL.with_label_values(&["set"]).inc();
                tracing::warn!(key = %self.key, "Failed to write leaderboard: {e}");
            })?;

        tracing::info!(name = %entry.name, score = entry.score, "Leaderboard entry stored");
        Ok(entry)
    }

    async fn load(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        match bounded(self.timeout, self.store.get(&self.key)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }
}

/// Trim and cap the name, and require a positive score.
pub fn validate_submission(name: &str, score: i64) -> Result<(String, u32), LeaderboardError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LeaderboardError::InvalidInput("name is required".into()));
    }
    if score <= 0 {
        return Err(LeaderboardError::InvalidInput(
            "score must be a positive integer".into(),
        ));
    }
    let score = u32::try_from(score)
        .map_err(|_| LeaderboardError::InvalidInput("score is out of range".into()))?;
    let name: String = trimmed.chars().take(MAX_NAME_CHARS).collect();
    // Truncation can expose trailing whitespace from the middle of the name
    Ok((name.trim_end().to_string(), score))
}

/// Highest score first; equal scores keep their existing order.
fn sort_by_score(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| b.score.cmp(&a.score));
}

async fn bounded<T>(
    timeout: Duration,
    op: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}
