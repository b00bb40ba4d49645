pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;

pub use api::*;
pub use models::*;
pub use utils::*;

use anyhow::{Context, Result};
use api::nhl_api::NhlApiClient;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use utils::bet_evaluator::{evaluate_bets, BetReport};
use utils::data::load_bets_file;

/// Everything a bets page shows for one team's game
#[derive(Debug, Clone, Serialize)]
pub struct BetStatusData {
    pub game_id: String,
    pub score: ScoreSnapshot,
    pub goals: Vec<GoalEvent>,
    pub reports: Vec<BetReport>,
}

/// Fetch the team's current game and evaluate every bet in `bets_file` against it
pub async fn fetch_bet_status(
    client: &NhlApiClient,
    team: &str,
    date: Option<NaiveDate>,
    bets_file: &Path,
) -> Result<BetStatusData> {
    let (game_id, score) = client
        .resolve_game(team, date)
        .await
        .with_context(|| format!("Failed to find a game for {}", team))?;

    let goals = client
        .fetch_game_goals(&game_id)
        .await
        .context("Failed to fetch game goals")?;

    let bets = load_bets_file(bets_file)
        .with_context(|| format!("Failed to load bets from {}", bets_file.display()))?;

    let snapshot = GameSnapshot {
        score,
        goals: goals.goals,
    };
    let reports = evaluate_bets(&bets.bets, &snapshot);

    Ok(BetStatusData {
        game_id,
        score: snapshot.score,
        goals: snapshot.goals,
        reports,
    })
}
