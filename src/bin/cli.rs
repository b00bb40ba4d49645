use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use nhl_goal_watcher::config::WatcherConfig;
use nhl_goal_watcher::event_key::goal_key;
use nhl_goal_watcher::fetch_bet_status;
use nhl_goal_watcher::nhl_api::NhlApiClient;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cli", about = "One-shot queries against the game backend")]
struct Cli {
    /// Backend base URL, overrides NHL_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the score of a team's game
    Score {
        #[arg(long)]
        team: Option<String>,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// List the goals of a game with their event keys
    Goals {
        #[arg(long)]
        game: String,
    },
    /// Evaluate the bets file against a team's game
    Bets {
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = WatcherConfig::from_env();
    let client = NhlApiClient::new(cli.api_url.unwrap_or_else(|| config.api_url.clone()));

    match cli.command {
        Command::Score { team, date } => {
            let team = team.unwrap_or_else(|| config.team.clone());
            let score = client
                .fetch_game_for_team(&team, date.or(config.date))
                .await
                .context("Failed to fetch score")?;

            if score.no_game {
                println!(
                    "No game for {}: {}",
                    team.to_uppercase(),
                    score.message.unwrap_or_default()
                );
            } else {
                println!(
                    "[{}] {} {} - {} {} ({})",
                    score.id.as_deref().unwrap_or("?"),
                    score.away.abbr,
                    score.away.score,
                    score.home.score,
                    score.home.abbr,
                    score.state()
                );
            }
        }
        Command::Goals { game } => {
            let response = client
                .fetch_game_goals(&game)
                .await
                .context("Failed to fetch goals")?;

            if response.goals.is_empty() {
                println!("No goals yet.");
            }
            for (i, goal) in response.goals.iter().enumerate() {
                println!(
                    "{}. P{} {} {} ({}) {}-{}  key={}",
                    i + 1,
                    goal.period.unwrap_or_default(),
                    goal.time_in_period.as_deref().unwrap_or("--:--"),
                    goal.scorer_name().unwrap_or("unknown"),
                    goal.scorer_team().unwrap_or("?"),
                    goal.away_score.unwrap_or_default(),
                    goal.home_score.unwrap_or_default(),
                    goal_key(goal)
                );
            }
        }
        Command::Bets { team, date, file } => {
            let team = team.unwrap_or_else(|| config.team.clone());
            let file = file.unwrap_or_else(|| config.bets_file.clone());
            let status = fetch_bet_status(&client, &team, date.or(config.date), &file).await?;

            println!(
                "Game {}: {} {} - {} {} ({})\n",
                status.game_id,
                status.score.away.abbr,
                status.score.away.score,
                status.score.home.score,
                status.score.home.abbr,
                status.score.state()
            );
            if status.reports.is_empty() {
                println!("No bets found.");
            }
            for (i, report) in status.reports.iter().enumerate() {
                println!("{}. {}", i + 1, report.format());
            }
        }
    }

    Ok(())
}
