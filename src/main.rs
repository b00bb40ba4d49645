use anyhow::Result;
use nhl_goal_watcher::api::nhl_api::NhlApiClient;
use nhl_goal_watcher::config::WatcherConfig;
use nhl_goal_watcher::error::ApiError;
use nhl_goal_watcher::fetch_bet_status;
use nhl_goal_watcher::watcher::{GoalEventHandler, GoalWatcher};
use nhl_goal_watcher::{GameSnapshot, GoalEvent};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const NO_GAME_RETRY: Duration = Duration::from_secs(60);

/// Logs goals and game starts, and re-checks the bets after every goal
struct GoalLogger {
    client: Arc<NhlApiClient>,
    config: WatcherConfig,
}

impl GoalEventHandler for GoalLogger {
    fn on_new_goal(&self, goal: &GoalEvent, all_goals: &[GoalEvent]) {
        info!(
            scorer = goal.scorer_name().unwrap_or("unknown"),
            team = goal.scorer_team().unwrap_or("?"),
            period = goal.period.unwrap_or_default(),
            time = goal.time_in_period.as_deref().unwrap_or(""),
            home = goal.home_score.unwrap_or_default(),
            away = goal.away_score.unwrap_or_default(),
            goals_in_game = all_goals.len(),
            "GOAL"
        );

        let client = Arc::clone(&self.client);
        let config = self.config.clone();
        tokio::spawn(async move {
            match fetch_bet_status(&client, &config.team, config.date, &config.bets_file).await {
                Ok(status) => {
                    for report in status.reports {
                        info!("{}", report.format());
                    }
                }
                Err(e) => warn!(error = %e, "Could not re-evaluate bets"),
            }
        });
    }

    fn on_game_started(&self, state: &str, snapshot: &GameSnapshot) {
        info!(
            state,
            home = %snapshot.score.home.abbr,
            away = %snapshot.score.away.abbr,
            "Game started"
        );
    }
}

/// Find the team's game, waiting out days without one
async fn wait_for_game(client: &NhlApiClient, config: &WatcherConfig) -> String {
    loop {
        match client.resolve_game(&config.team, config.date).await {
            Ok((game_id, score)) => {
                info!(
                    game_id = %game_id,
                    state = score.state(),
                    "{} @ {}",
                    score.away.abbr,
                    score.home.abbr
                );
                return game_id;
            }
            Err(ApiError::NoGame(team)) => info!(team = %team, "No game yet"),
            Err(e) => warn!(error = %e, "Failed to look up game"),
        }
        tokio::time::sleep(NO_GAME_RETRY).await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = WatcherConfig::from_env();
    info!(team = %config.team, api = %config.api_url, "NHL goal watcher");

    let client = Arc::new(NhlApiClient::new(config.api_url.clone()).on_date(config.date));
    let handler = Arc::new(GoalLogger {
        client: Arc::clone(&client),
        config: config.clone(),
    });

    let mut watcher = GoalWatcher::new(client.clone(), handler, config.watch_options());
    if config.persist_across_sessions {
        watcher = watcher.with_store(config.seen_store());
    }

    tokio::select! {
        game_id = wait_for_game(&client, &config) => {
            watcher.watch_game(&game_id).await;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted before the game was found");
            return Ok(());
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
    }
    info!("Shutting down");
    watcher.stop().await;

    Ok(())
}
