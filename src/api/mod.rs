pub mod nhl_api;

use crate::error::ApiError;
use crate::models::GameSnapshot;
use async_trait::async_trait;

/// Where the watcher gets its `(score, goals)` snapshots from.
///
/// Implementations return an error on any non-success response; the watcher
/// treats every error as transient.
#[async_trait]
pub trait GameDataSource: Send + Sync {
    async fn fetch_snapshot(&self, game_id: &str) -> Result<GameSnapshot, ApiError>;
}
