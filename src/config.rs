//! Runtime settings, read from the environment (and `.env` via `dotenv`).
//!
//! Every value has a default; unset or unparsable variables fall back to it.

use crate::utils::seen_store::{FileKeyValueStore, SeenEventStore};
use crate::utils::transition::DEFAULT_PRE_GAME_STATES;
use crate::utils::watcher::{WatchOptions, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
use chrono::NaiveDate;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Base URL of the game backend (`NHL_API_URL`)
    pub api_url: String,
    /// Team whose game gets watched (`TEAM_ABBR`)
    pub team: String,
    /// Day to look up instead of today (`GAME_DATE`, YYYY-MM-DD)
    pub date: Option<NaiveDate>,
    pub poll_interval: Duration,
    pub fire_delay: Duration,
    pub emit_existing_on_start: bool,
    pub persist_across_sessions: bool,
    /// Directory of the seen-goals store (`SEEN_STORE_DIR`)
    pub seen_store_dir: PathBuf,
    pub bets_file: PathBuf,
    pub pre_game_states: Vec<String>,
    pub listen_addr: SocketAddr,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001".to_string(),
            team: "MTL".to_string(),
            date: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            fire_delay: Duration::ZERO,
            emit_existing_on_start: false,
            persist_across_sessions: true,
            seen_store_dir: PathBuf::from("cache"),
            bets_file: PathBuf::from("data/bets.json"),
            pre_game_states: DEFAULT_PRE_GAME_STATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl WatcherConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; `from_env` uses the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let parse_ms = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };
        let parse_bool = |key: &str, default: bool| match lookup(key).as_deref().map(str::trim) {
            Some("true") | Some("TRUE") | Some("1") => true,
            Some("false") | Some("FALSE") | Some("0") => false,
            _ => default,
        };

        let pre_game_states = lookup("PRE_GAME_STATES")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|states| !states.is_empty())
            .unwrap_or(defaults.pre_game_states);

        Self {
            api_url: lookup("NHL_API_URL").unwrap_or(defaults.api_url),
            team: lookup("TEAM_ABBR")
                .map(|t| t.trim().to_uppercase())
                .unwrap_or(defaults.team),
            date: lookup("GAME_DATE").and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok()),
            poll_interval: parse_ms("POLL_INTERVAL_MS", defaults.poll_interval)
                .max(MIN_POLL_INTERVAL),
            fire_delay: parse_ms("FIRE_DELAY_MS", defaults.fire_delay),
            emit_existing_on_start: parse_bool(
                "EMIT_EXISTING_ON_START",
                defaults.emit_existing_on_start,
            ),
            persist_across_sessions: parse_bool(
                "PERSIST_ACROSS_SESSIONS",
                defaults.persist_across_sessions,
            ),
            seen_store_dir: lookup("SEEN_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.seen_store_dir),
            bets_file: lookup("BETS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.bets_file),
            pre_game_states,
            listen_addr: lookup("LISTEN_ADDR")
                .and_then(|a| a.parse().ok())
                .unwrap_or(defaults.listen_addr),
        }
    }

    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            poll_interval: self.poll_interval,
            fire_delay: self.fire_delay,
            emit_existing_on_start: self.emit_existing_on_start,
            persist_across_sessions: self.persist_across_sessions,
            pre_game_states: self.pre_game_states.clone(),
        }
    }

    pub fn seen_store(&self) -> Arc<SeenEventStore> {
        Arc::new(SeenEventStore::new(Arc::new(FileKeyValueStore::new(
            &self.seen_store_dir,
        ))))
    }
}
