use crate::api::GameDataSource;
use crate::error::ApiError;
use crate::models::{GameSnapshot, GoalsResponse, ScoreSnapshot};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the game backend that proxies the NHL web API.
///
/// Endpoints:
/// - `GET /api/game/now?team=MTL&date=YYYY-MM-DD` -> [`ScoreSnapshot`]
/// - `GET /api/game/:gameId/goals` -> [`GoalsResponse`]
pub struct NhlApiClient {
    client: Client,
    base_url: String,
    date: Option<NaiveDate>,
}

impl NhlApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            date: None,
        }
    }

    /// Look up games on a specific day instead of "now"
    pub fn on_date(mut self, date: Option<NaiveDate>) -> Self {
        self.date = date;
        self
    }

    /// Get a team's game for today, or for `date` if given
    pub async fn fetch_game_for_team(
        &self,
        team: &str,
        date: Option<NaiveDate>,
    ) -> Result<ScoreSnapshot, ApiError> {
        let url = format!("{}/api/game/now", self.base_url);
        let mut query = vec![("team", team.to_uppercase())];
        if let Some(date) = date {
            query.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        self.get_json(&url, &query).await
    }

    /// Get the goal events for a game, players already enriched by the backend
    pub async fn fetch_game_goals(&self, game_id: &str) -> Result<GoalsResponse, ApiError> {
        let url = format!("{}/api/game/{}/goals", self.base_url, game_id.trim());
        self.get_json(&url, &[]).await
    }

    /// Find the id of the team's game, failing with [`ApiError::NoGame`] on off days
    pub async fn resolve_game(
        &self,
        team: &str,
        date: Option<NaiveDate>,
    ) -> Result<(String, ScoreSnapshot), ApiError> {
        let score = self.fetch_game_for_team(team, date).await?;
        match score.id.clone() {
            Some(id) if !score.no_game => Ok((id, score)),
            _ => Err(ApiError::NoGame(team.to_uppercase())),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|source| ApiError::Request {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        response.json().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl GameDataSource for NhlApiClient {
    async fn fetch_snapshot(&self, game_id: &str) -> Result<GameSnapshot, ApiError> {
        let mut goals = self.fetch_game_goals(game_id).await?;

        let team = goals
            .home
            .as_ref()
            .or(goals.away.as_ref())
            .map(|t| t.abbr.clone())
            .ok_or_else(|| ApiError::NoGame(game_id.to_string()))?;

        let score = self.fetch_game_for_team(&team, self.date).await?;
        if let Some(found) = score.id.as_deref() {
            if found != game_id {
                return Err(ApiError::GameMismatch {
                    game_id: game_id.to_string(),
                    found: found.to_string(),
                });
            }
        }

        for goal in goals.goals.iter_mut() {
            if goal.game_pk.is_none() {
                goal.game_pk = Some(game_id.to_string());
            }
        }

        Ok(GameSnapshot {
            score,
            goals: goals.goals,
        })
    }
}
