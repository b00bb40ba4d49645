//! Error types for the library boundaries.
//!
//! None of these ever escape the watcher loop: fetch and storage failures are
//! logged and absorbed there. They surface only to direct callers of the
//! HTTP client, the key-value port and the bets file helpers.

use reqwest::StatusCode;

/// Failures talking to the game backend
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no game scheduled for {0}")]
    NoGame(String),

    #[error("goals for game {game_id} belong to a different game ({found})")]
    GameMismatch { game_id: String, found: String },
}

/// Failures of the key-value area backing the seen-event store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Failures loading or saving bets.json
#[derive(Debug, thiserror::Error)]
pub enum BetsFileError {
    #[error("bets file i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bets file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}
