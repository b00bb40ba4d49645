/// Game states that mean the puck hasn't dropped yet
pub const DEFAULT_PRE_GAME_STATES: &[&str] = &["FUT", "PRE", "PREGAME"];

/// Fires once when a game leaves its pre-game state.
///
/// The first state ever seen also fires if it isn't pre-game, so a watcher
/// started in the middle of a game still announces the start.
#[derive(Debug, Clone)]
pub struct TransitionDetector {
    pre_game_states: Vec<String>,
    current: Option<String>,
}

impl TransitionDetector {
    pub fn new<I, S>(pre_game_states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            pre_game_states: pre_game_states.into_iter().map(Into::into).collect(),
            current: None,
        }
    }

    pub fn is_pre_game(&self, state: &str) -> bool {
        self.pre_game_states
            .iter()
            .any(|s| s.eq_ignore_ascii_case(state))
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Record `state`; returns true if the game just started
    pub fn observe(&mut self, state: &str) -> bool {
        let started = match self.current.as_deref() {
            None => !self.is_pre_game(state),
            Some(prev) if prev == state => return false,
            Some(prev) => self.is_pre_game(prev) && !self.is_pre_game(state),
        };
        self.current = Some(state.to_string());
        started
    }

    /// Forget everything, as if no state had been seen
    pub fn reset(&mut self) {
        self.current = None;
    }
}

impl Default for TransitionDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PRE_GAME_STATES.iter().copied())
    }
}
