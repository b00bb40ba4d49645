//! Polls a game and reports goals that haven't been delivered yet.
//!
//! One session runs per game as a tokio task:
//!
//! 1. fetch a `(score, goals)` snapshot, skipping the tick on any error
//! 2. feed `score.state` to the [`TransitionDetector`] and report a start
//! 3. diff the goals against the previous poll
//! 4. remember the goals in memory and in the [`SeenEventStore`]
//! 5. hand new goals to the handler, now or after `fire_delay`
//! 6. sleep `poll_interval` and go again
//!
//! The same [`CancellationToken`] guards the fetch, the sleep and every delayed
//! delivery, so nothing reaches the handler once a session is cancelled.

use crate::api::GameDataSource;
use crate::models::{GameSnapshot, GoalEvent};
use crate::utils::event_key::goal_key;
use crate::utils::goal_diff::diff_new_goals;
use crate::utils::seen_store::SeenEventStore;
use crate::utils::transition::{TransitionDetector, DEFAULT_PRE_GAME_STATES};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(4000);
/// Shortest pause between polls, whatever the options say
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    pub poll_interval: Duration,
    /// Wait this long before delivering a goal, e.g. to line up with a TV stream
    pub fire_delay: Duration,
    /// Deliver every goal already on the board when the watcher starts
    pub emit_existing_on_start: bool,
    /// Remember delivered goals across restarts
    pub persist_across_sessions: bool,
    pub pre_game_states: Vec<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            fire_delay: Duration::ZERO,
            emit_existing_on_start: false,
            persist_across_sessions: true,
            pre_game_states: DEFAULT_PRE_GAME_STATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Receives watcher notifications. Called on the session task; keep it quick.
pub trait GoalEventHandler: Send + Sync + 'static {
    /// A goal not delivered before, with every goal currently on the board
    fn on_new_goal(&self, goal: &GoalEvent, all_goals: &[GoalEvent]);

    /// The game left its pre-game state (or was already underway at start)
    fn on_game_started(&self, _state: &str, _snapshot: &GameSnapshot) {}
}

/// What one successful poll produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub new_goals: Vec<GoalEvent>,
    pub started: Option<String>,
}

/// Per-game memory of the watcher
pub struct WatchSession {
    game_id: String,
    emit_existing_on_start: bool,
    store: Option<Arc<SeenEventStore>>,
    previous_goals: Option<Vec<GoalEvent>>,
    detector: TransitionDetector,
}

impl WatchSession {
    pub fn new(game_id: impl Into<String>, options: &WatchOptions, store: Option<Arc<SeenEventStore>>) -> Self {
        Self {
            game_id: game_id.into(),
            emit_existing_on_start: options.emit_existing_on_start,
            store: store.filter(|_| options.persist_across_sessions),
            previous_goals: None,
            detector: TransitionDetector::new(options.pre_game_states.iter().cloned()),
        }
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Reconcile a snapshot with what was seen before.
    ///
    /// `initial` is true only for the session's very first poll attempt. Its
    /// result is replaced wholesale: every goal if replay was asked for,
    /// nothing otherwise. If that first attempt failed, the first snapshot that
    /// does arrive is diffed against the goals already in the seen store.
    pub fn process(&mut self, snapshot: &GameSnapshot, initial: bool) -> TickOutcome {
        let goals = &snapshot.goals;

        let previous = match self.previous_goals.take() {
            Some(previous) => previous,
            None => self.seed_previous(goals),
        };

        let started = snapshot
            .score
            .state
            .as_deref()
            .filter(|s| !s.is_empty())
            .filter(|s| self.detector.observe(s))
            .map(str::to_string);

        let new_goals = if initial {
            if self.emit_existing_on_start {
                goals.clone()
            } else {
                Vec::new()
            }
        } else {
            diff_new_goals(&previous, goals)
        };

        self.previous_goals = Some(goals.clone());

        if let Some(store) = &self.store {
            store.save(&self.game_id, goals);
        }

        TickOutcome { new_goals, started }
    }

    fn seed_previous(&self, goals: &[GoalEvent]) -> Vec<GoalEvent> {
        match &self.store {
            Some(store) => {
                let seen = store.load(&self.game_id);
                goals
                    .iter()
                    .filter(|g| seen.contains(&goal_key(g)))
                    .cloned()
                    .collect()
            }
            None => Vec::new(),
        }
    }
}

/// Controls a running session. Dropping it cancels the session.
#[derive(Debug)]
pub struct WatchHandle {
    game_id: String,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Stop polling and drop pending deliveries. Safe to call repeatedly.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the session task to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(game_id = %self.game_id, error = %e, "Watch task ended abnormally");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Start watching `game_id` on the current tokio runtime
pub fn watch(
    source: Arc<dyn GameDataSource>,
    game_id: impl Into<String>,
    handler: Arc<dyn GoalEventHandler>,
    options: WatchOptions,
    store: Option<Arc<SeenEventStore>>,
) -> WatchHandle {
    let game_id = game_id.into();
    let token = CancellationToken::new();
    let session = WatchSession::new(game_id.clone(), &options, store);

    let task = tokio::spawn(run_session(
        session,
        source,
        handler,
        options,
        token.clone(),
    ));

    WatchHandle {
        game_id,
        token,
        task: Some(task),
    }
}

async fn run_session(
    mut session: WatchSession,
    source: Arc<dyn GameDataSource>,
    handler: Arc<dyn GoalEventHandler>,
    options: WatchOptions,
    token: CancellationToken,
) {
    info!(
        game_id = session.game_id(),
        poll_ms = options.poll_interval.max(MIN_POLL_INTERVAL).as_millis() as u64,
        fire_delay_ms = options.fire_delay.as_millis() as u64,
        "Goal watcher started"
    );

    let poll_interval = options.poll_interval.max(MIN_POLL_INTERVAL);
    let mut initial = true;
    loop {
        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = source.fetch_snapshot(session.game_id()) => result,
        };

        match fetched {
            Ok(snapshot) => {
                let outcome = session.process(&snapshot, initial);

                if let Some(state) = &outcome.started {
                    info!(game_id = session.game_id(), state = %state, "Game started");
                    announce_start(handler.as_ref(), state, &snapshot, &token);
                }

                if !outcome.new_goals.is_empty() {
                    info!(
                        game_id = session.game_id(),
                        count = outcome.new_goals.len(),
                        "New goals detected"
                    );
                    deliver(
                        &handler,
                        outcome.new_goals,
                        snapshot.goals,
                        options.fire_delay,
                        &token,
                    );
                }
            }
            Err(e) => {
                warn!(game_id = session.game_id(), error = %e, "Poll failed, retrying next interval");
            }
        }
        initial = false;

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(poll_interval) => {}
        }
    }

    info!(game_id = session.game_id(), "Goal watcher stopped");
}

fn deliver(
    handler: &Arc<dyn GoalEventHandler>,
    new_goals: Vec<GoalEvent>,
    all_goals: Vec<GoalEvent>,
    delay: Duration,
    token: &CancellationToken,
) {
    if delay.is_zero() {
        fire(handler.as_ref(), &new_goals, &all_goals, token);
        return;
    }

    let handler = Arc::clone(handler);
    let token = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(count = new_goals.len(), "Dropping delayed goals after cancel");
            }
            _ = tokio::time::sleep(delay) => {
                fire(handler.as_ref(), &new_goals, &all_goals, &token);
            }
        }
    });
}

fn announce_start(
    handler: &dyn GoalEventHandler,
    state: &str,
    snapshot: &GameSnapshot,
    token: &CancellationToken,
) {
    if !token.is_cancelled() {
        handler.on_game_started(state, snapshot);
    }
}

fn fire(
    handler: &dyn GoalEventHandler,
    new_goals: &[GoalEvent],
    all_goals: &[GoalEvent],
    token: &CancellationToken,
) {
    if token.is_cancelled() {
        return;
    }
    for goal in new_goals {
        handler.on_new_goal(goal, all_goals);
    }
}

/// Keeps at most one session alive and swaps it when the game changes
pub struct GoalWatcher {
    source: Arc<dyn GameDataSource>,
    handler: Arc<dyn GoalEventHandler>,
    store: Option<Arc<SeenEventStore>>,
    options: WatchOptions,
    active: Option<WatchHandle>,
}

impl GoalWatcher {
    pub fn new(
        source: Arc<dyn GameDataSource>,
        handler: Arc<dyn GoalEventHandler>,
        options: WatchOptions,
    ) -> Self {
        Self {
            source,
            handler,
            store: None,
            options,
            active: None,
        }
    }

    pub fn with_store(mut self, store: Arc<SeenEventStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn current_game(&self) -> Option<&str> {
        self.active.as_ref().map(WatchHandle::game_id)
    }

    /// Watch `game_id`. The previous session, if any, is fully stopped first;
    /// asking for the game already being watched does nothing.
    pub async fn watch_game(&mut self, game_id: &str) {
        if self.current_game() == Some(game_id) {
            return;
        }
        self.stop().await;
        self.start(game_id);
    }

    /// Replace the options, restarting the current session if they changed
    pub async fn set_options(&mut self, options: WatchOptions) {
        if options == self.options {
            return;
        }
        self.options = options;
        if let Some(game_id) = self.current_game().map(str::to_string) {
            self.stop().await;
            self.start(&game_id);
        }
    }

    pub async fn stop(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.shutdown().await;
        }
    }

    fn start(&mut self, game_id: &str) {
        self.active = Some(watch(
            Arc::clone(&self.source),
            game_id,
            Arc::clone(&self.handler),
            self.options.clone(),
            self.store.clone(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::{Scorer, ScoreSnapshot};
    use crate::utils::seen_store::MemoryKeyValueStore;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use reqwest::StatusCode;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const POLL: Duration = Duration::from_millis(4000);

    /// Serves queued responses in order, then repeats the last one
    struct ScriptedSource {
        responses: Mutex<Vec<Result<GameSnapshot, ()>>>,
        calls: AtomicUsize,
        games: Mutex<Vec<String>>,
        latency: Duration,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<GameSnapshot, ()>>) -> Arc<Self> {
            Self::slow(responses, Duration::ZERO)
        }

        /// Every fetch takes `latency` before answering
        fn slow(responses: Vec<Result<GameSnapshot, ()>>, latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
                games: Mutex::new(Vec::new()),
                latency,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GameDataSource for ScriptedSource {
        async fn fetch_snapshot(&self, game_id: &str) -> Result<GameSnapshot, ApiError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.games.lock().push(game_id.to_string());
            let responses = self.responses.lock();
            let response = responses
                .get(n)
                .or_else(|| responses.last())
                .cloned()
                .unwrap_or(Err(()));
            response.map_err(|_| ApiError::Status {
                url: format!("/api/game/{}/goals", game_id),
                status: StatusCode::SERVICE_UNAVAILABLE,
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        goals: Mutex<Vec<(String, usize)>>,
        starts: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn goal_ids(&self) -> Vec<String> {
            self.goals.lock().iter().map(|(id, _)| id.clone()).collect()
        }
    }

    impl GoalEventHandler for Recorder {
        fn on_new_goal(&self, goal: &GoalEvent, all_goals: &[GoalEvent]) {
            self.goals
                .lock()
                .push((goal_key(goal), all_goals.len()));
        }

        fn on_game_started(&self, state: &str, _snapshot: &GameSnapshot) {
            self.starts.lock().push(state.to_string());
        }
    }

    fn goal(id: &str) -> GoalEvent {
        GoalEvent {
            id: Some(id.to_string()),
            game_pk: Some("g1".to_string()),
            scorer: Some(Scorer {
                full_name: Some("Cole Caufield".to_string()),
                team: Some("MTL".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn snapshot(state: &str, ids: &[&str]) -> GameSnapshot {
        GameSnapshot {
            score: ScoreSnapshot {
                id: Some("g1".to_string()),
                state: Some(state.to_string()),
                ..Default::default()
            },
            goals: ids.iter().map(|id| goal(id)).collect(),
        }
    }

    fn ids(goals: &[GoalEvent]) -> Vec<&str> {
        goals.iter().filter_map(|g| g.id.as_deref()).collect()
    }

    fn memory_seen_store() -> Arc<SeenEventStore> {
        Arc::new(SeenEventStore::new(Arc::new(MemoryKeyValueStore::new())))
    }

    fn no_persistence() -> WatchOptions {
        WatchOptions {
            persist_across_sessions: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_cold_start_with_everything_already_seen_emits_nothing() {
        let store = memory_seen_store();
        let snap = snapshot("LIVE", &["1", "2"]);
        store.save("g1", &snap.goals);

        let mut session = WatchSession::new("g1", &WatchOptions::default(), Some(store));
        assert!(session.process(&snap, true).new_goals.is_empty());
    }

    #[test]
    fn test_cold_start_without_persistence_emits_nothing() {
        let mut session = WatchSession::new("g1", &no_persistence(), None);
        let outcome = session.process(&snapshot("LIVE", &["1", "2"]), true);
        assert!(outcome.new_goals.is_empty());
    }

    #[test]
    fn test_cold_start_replay_emits_everything() {
        let options = WatchOptions {
            emit_existing_on_start: true,
            ..no_persistence()
        };
        let mut session = WatchSession::new("g1", &options, None);
        let outcome = session.process(&snapshot("LIVE", &["1", "2"]), true);
        assert_eq!(ids(&outcome.new_goals), vec!["1", "2"]);
    }

    #[test]
    fn test_later_ticks_report_only_new_goals() {
        let mut session = WatchSession::new("g1", &no_persistence(), None);
        session.process(&snapshot("LIVE", &["1"]), true);

        let outcome = session.process(&snapshot("LIVE", &["1", "2"]), false);
        assert_eq!(ids(&outcome.new_goals), vec!["2"]);

        let outcome = session.process(&snapshot("LIVE", &["1", "2"]), false);
        assert!(outcome.new_goals.is_empty());
    }

    #[test]
    fn test_seen_store_seeds_when_first_poll_failed() {
        let store = memory_seen_store();
        store.save("g1", &[goal("1"), goal("2")]);

        let mut session = WatchSession::new("g1", &WatchOptions::default(), Some(store));
        // First attempt failed, so this snapshot is not the initial one
        let outcome = session.process(&snapshot("LIVE", &["1", "2", "3"]), false);
        assert_eq!(ids(&outcome.new_goals), vec!["3"]);
    }

    #[test]
    fn test_without_persistence_store_is_ignored() {
        let store = memory_seen_store();
        store.save("g1", &[goal("1")]);

        let mut session = WatchSession::new("g1", &no_persistence(), Some(store.clone()));
        let outcome = session.process(&snapshot("LIVE", &["1", "2"]), false);
        assert_eq!(ids(&outcome.new_goals), vec!["1", "2"]);
        assert!(!store.load("g1").contains("2"));
    }

    #[test]
    fn test_every_tick_persists_current_goals() {
        let store = memory_seen_store();
        let mut session = WatchSession::new("g1", &WatchOptions::default(), Some(store.clone()));
        session.process(&snapshot("LIVE", &["1"]), true);
        session.process(&snapshot("LIVE", &["1", "2"]), false);

        let seen = store.load("g1");
        assert!(seen.contains("1") && seen.contains("2"));
    }

    #[test]
    fn test_session_reports_game_start_once() {
        let mut session = WatchSession::new("g1", &no_persistence(), None);
        let started: Vec<Option<String>> = ["FUT", "FUT", "LIVE", "LIVE", "FINAL"]
            .iter()
            .enumerate()
            .map(|(i, state)| session.process(&snapshot(state, &[]), i == 0).started)
            .collect();
        assert_eq!(
            started,
            vec![None, None, Some("LIVE".to_string()), None, None]
        );
    }

    #[test]
    fn test_missing_state_does_not_touch_detector() {
        let mut session = WatchSession::new("g1", &no_persistence(), None);
        let mut snap = snapshot("FUT", &[]);
        session.process(&snap, true);
        snap.score.state = None;
        assert_eq!(session.process(&snap, false).started, None);
        snap.score.state = Some("LIVE".to_string());
        assert_eq!(session.process(&snap, false).started.as_deref(), Some("LIVE"));
    }

    #[test]
    fn test_nothing_reaches_the_handler_after_cancel() {
        let recorder = Recorder::default();
        let snap = snapshot("LIVE", &["1"]);
        let token = CancellationToken::new();
        token.cancel();

        announce_start(&recorder, "LIVE", &snap, &token);
        fire(&recorder, &snap.goals, &snap.goals, &token);

        assert!(recorder.starts.lock().is_empty());
        assert!(recorder.goal_ids().is_empty());

        let live = CancellationToken::new();
        announce_start(&recorder, "LIVE", &snap, &live);
        fire(&recorder, &snap.goals, &snap.goals, &live);
        assert_eq!(*recorder.starts.lock(), vec!["LIVE".to_string()]);
        assert_eq!(recorder.goal_ids(), vec!["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_survives_fetch_errors() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot("LIVE", &["1"])),
            Err(()),
            Err(()),
            Ok(snapshot("LIVE", &["1", "2"])),
        ]);
        let recorder = Arc::new(Recorder::default());
        let handle = watch(source.clone(), "g1", recorder.clone(), no_persistence(), None);

        tokio::time::sleep(POLL * 3 + Duration::from_millis(100)).await;

        assert_eq!(source.calls(), 4);
        assert_eq!(recorder.goal_ids(), vec!["2"]);
        // Delivered with the whole board as context
        assert_eq!(recorder.goals.lock()[0].1, 2);
        assert_eq!(*recorder.starts.lock(), vec!["LIVE".to_string()]);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_first_poll_falls_back_to_seen_store() {
        let store = memory_seen_store();
        store.save("g1", &[goal("1")]);
        let source = ScriptedSource::new(vec![Err(()), Ok(snapshot("LIVE", &["1", "2"]))]);
        let recorder = Arc::new(Recorder::default());
        let handle = watch(
            source.clone(),
            "g1",
            recorder.clone(),
            WatchOptions::default(),
            Some(store),
        );

        tokio::time::sleep(POLL + Duration::from_millis(100)).await;

        assert_eq!(recorder.goal_ids(), vec!["2"]);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fire_delay_postpones_delivery_not_polling() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot("LIVE", &[])),
            Ok(snapshot("LIVE", &["1"])),
        ]);
        let recorder = Arc::new(Recorder::default());
        let options = WatchOptions {
            fire_delay: Duration::from_millis(2500),
            ..no_persistence()
        };
        let handle = watch(source.clone(), "g1", recorder.clone(), options, None);

        // Goal seen at 4s, due at 6.5s
        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert!(recorder.goal_ids().is_empty());
        assert_eq!(source.calls(), 2);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(recorder.goal_ids(), vec!["1"]);

        // The start notification is never delayed
        assert_eq!(recorder.starts.lock().len(), 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_delivery_and_stops_polling() {
        let source = ScriptedSource::new(vec![
            Ok(snapshot("LIVE", &[])),
            Ok(snapshot("LIVE", &["1"])),
        ]);
        let recorder = Arc::new(Recorder::default());
        let options = WatchOptions {
            fire_delay: Duration::from_millis(2500),
            ..no_persistence()
        };
        let handle = watch(source.clone(), "g1", recorder.clone(), options, None);

        tokio::time::sleep(Duration::from_millis(5000)).await;
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());

        tokio::time::sleep(POLL * 3).await;
        assert!(recorder.goal_ids().is_empty());
        assert_eq!(source.calls(), 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_fetch_discards_its_result() {
        let source = ScriptedSource::slow(
            vec![Ok(snapshot("FUT", &[])), Ok(snapshot("LIVE", &["1"]))],
            Duration::from_millis(1000),
        );
        let recorder = Arc::new(Recorder::default());
        let handle = watch(source.clone(), "g1", recorder.clone(), no_persistence(), None);

        // First fetch answers at 1s, the second starts at 5s and answers at 6s
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(source.calls(), 2);
        handle.cancel();

        tokio::time::sleep(POLL * 2).await;
        assert!(recorder.goal_ids().is_empty());
        assert!(recorder.starts.lock().is_empty());
        assert_eq!(source.calls(), 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_for_different_games_share_one_store() {
        let store = memory_seen_store();
        let first = ScriptedSource::new(vec![
            Ok(snapshot("LIVE", &["a1"])),
            Ok(snapshot("LIVE", &["a1", "a2"])),
        ]);
        let second = ScriptedSource::new(vec![
            Ok(snapshot("LIVE", &["b1"])),
            Ok(snapshot("LIVE", &["b1", "b2"])),
        ]);
        let recorder = Arc::new(Recorder::default());

        let g1 = watch(
            first,
            "g1",
            recorder.clone(),
            WatchOptions::default(),
            Some(store.clone()),
        );
        let g2 = watch(
            second,
            "g2",
            recorder.clone(),
            WatchOptions::default(),
            Some(store.clone()),
        );

        tokio::time::sleep(POLL + Duration::from_millis(100)).await;
        g1.shutdown().await;
        g2.shutdown().await;

        let mut delivered = recorder.goal_ids();
        delivered.sort();
        assert_eq!(delivered, vec!["a2", "b2"]);
        assert_eq!(
            store.load("g1"),
            HashSet::from(["a1".to_string(), "a2".to_string()])
        );
        assert_eq!(
            store.load("g2"),
            HashSet::from(["b1".to_string(), "b2".to_string()])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_poll_interval_still_pauses_between_polls() {
        let source = ScriptedSource::new(vec![Ok(snapshot("LIVE", &[]))]);
        let options = WatchOptions {
            poll_interval: Duration::ZERO,
            ..no_persistence()
        };
        let handle = watch(source.clone(), "g1", Arc::new(Recorder::default()), options, None);

        tokio::time::sleep(MIN_POLL_INTERVAL * 4 + Duration::from_millis(10)).await;
        assert_eq!(source.calls(), 5);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_the_handle_cancels_the_session() {
        let source = ScriptedSource::new(vec![Ok(snapshot("LIVE", &[]))]);
        let recorder = Arc::new(Recorder::default());
        let handle = watch(source.clone(), "g1", recorder, no_persistence(), None);

        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(handle);
        tokio::time::sleep(POLL * 2).await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_games_tears_down_previous_session() {
        let source = ScriptedSource::new(vec![Ok(snapshot("LIVE", &[]))]);
        let recorder = Arc::new(Recorder::default());
        let mut watcher = GoalWatcher::new(source.clone(), recorder.clone(), no_persistence());

        watcher.watch_game("g1").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        // Same game again is a no-op
        watcher.watch_game("g1").await;
        assert_eq!(watcher.current_game(), Some("g1"));

        watcher.watch_game("g2").await;
        tokio::time::sleep(POLL + Duration::from_millis(100)).await;
        assert_eq!(watcher.current_game(), Some("g2"));

        let games = source.games.lock().clone();
        assert_eq!(games, vec!["g1", "g2", "g2"]);
        // A fresh session means a fresh start notification
        assert_eq!(recorder.starts.lock().len(), 2);

        watcher.stop().await;
        assert_eq!(watcher.current_game(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changing_options_restarts_the_session() {
        let source = ScriptedSource::new(vec![Ok(snapshot("LIVE", &["1"]))]);
        let recorder = Arc::new(Recorder::default());
        let mut watcher = GoalWatcher::new(source.clone(), recorder.clone(), no_persistence());

        watcher.watch_game("g1").await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(recorder.goal_ids().is_empty());

        watcher
            .set_options(WatchOptions {
                emit_existing_on_start: true,
                ..no_persistence()
            })
            .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(recorder.goal_ids(), vec!["1"]);
        assert_eq!(source.calls(), 2);
        watcher.stop().await;
    }
}
