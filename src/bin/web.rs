use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use nhl_goal_watcher::config::WatcherConfig;
use nhl_goal_watcher::data::{load_bets_file, parse_bets_json, save_bets_file, SaveResult};
use nhl_goal_watcher::fetch_bet_status;
use nhl_goal_watcher::nhl_api::NhlApiClient;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct AppState {
    client: NhlApiClient,
    config: WatcherConfig,
    // Readers of bets.json wait while it is being rewritten
    bets_lock: RwLock<()>,
}

type SharedState = Arc<AppState>;

#[derive(Debug, Deserialize)]
struct StatusQuery {
    team: Option<String>,
    date: Option<NaiveDate>,
}

async fn health() -> &'static str {
    "ok"
}

async fn get_bets(State(state): State<SharedState>) -> Response {
    let _read = state.bets_lock.read().await;
    match load_bets_file(&state.config.bets_file) {
        Ok(file) => Json(file).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to load bets.json: {}", e),
        )
            .into_response(),
    }
}

async fn post_bets(State(state): State<SharedState>, body: String) -> Response {
    let file = match parse_bets_json(&body) {
        Ok(file) => file,
        Err(e) => {
            let result = SaveResult {
                ok: false,
                error: Some(e.to_string()),
            };
            return (StatusCode::BAD_REQUEST, Json(result)).into_response();
        }
    };

    let _write = state.bets_lock.write().await;
    let result = save_bets_file(&state.config.bets_file, &file.bets);
    let status = if result.ok {
        info!(count = file.bets.len(), "Saved bets.json");
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(result)).into_response()
}

async fn bets_status(
    State(state): State<SharedState>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let team = query.team.unwrap_or_else(|| state.config.team.clone());
    let date = query.date.or(state.config.date);

    let _read = state.bets_lock.read().await;
    match fetch_bet_status(&state.client, &team, date, &state.config.bets_file).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => (StatusCode::BAD_GATEWAY, format!("{:#}", e)).into_response(),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = WatcherConfig::from_env();
    let listen_addr = config.listen_addr;
    let state = Arc::new(AppState {
        client: NhlApiClient::new(config.api_url.clone()),
        config,
        bets_lock: RwLock::new(()),
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/bets", get(get_bets).post(post_bets))
        .route("/api/bets/status", get(bets_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %listen_addr, error = %e, "Failed to bind");
            return;
        }
    };

    info!("Starting web server at http://{}", listen_addr);
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
    }
}
