use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Accept ids and jersey numbers that arrive either as JSON strings or numbers
fn de_opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// The player credited with a goal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorer {
    #[serde(
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub full_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub number: Option<String>,
    pub team: Option<String>, // Team abbreviation, e.g. "MTL"
    pub headshot: Option<String>,
}

/// Link to a replay of the goal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub url: Option<String>,
}

/// One scoring play as reported by the game backend.
///
/// A fresh list of these arrives on every poll; the watcher never edits them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalEvent {
    #[serde(
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub game_pk: Option<String>,
    pub period: Option<u32>,
    pub time_in_period: Option<String>, // "MM:SS" elapsed in the period
    pub strength: Option<String>,
    pub scorer: Option<Scorer>,
    pub away_score: Option<u32>,
    pub home_score: Option<u32>,
    pub highlight: Option<Highlight>,
}

impl GoalEvent {
    pub fn scorer_name(&self) -> Option<&str> {
        self.scorer.as_ref()?.full_name.as_deref()
    }

    pub fn scorer_team(&self) -> Option<&str> {
        self.scorer.as_ref()?.team.as_deref()
    }
}

/// Goals that may arrive as `null` before the puck drops
fn de_score_or_zero<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or_default())
}

/// A team's line in the score payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamScore {
    #[serde(default)]
    pub abbr: String,
    #[serde(default, deserialize_with = "de_score_or_zero")]
    pub score: u32,
}

/// Current score and game state for a team's game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSnapshot {
    #[serde(
        default,
        deserialize_with = "de_opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub date: Option<String>,
    pub state: Option<String>, // "FUT", "PRE", "LIVE", "CRIT", "FINAL", "OFF", ...
    #[serde(default)]
    pub home: TeamScore,
    #[serde(default)]
    pub away: TeamScore,
    #[serde(default)]
    pub no_game: bool,
    pub message: Option<String>,
}

impl ScoreSnapshot {
    pub fn state(&self) -> &str {
        self.state.as_deref().unwrap_or_default()
    }

    pub fn total(&self) -> u32 {
        self.home.score.saturating_add(self.away.score)
    }

    /// Score for the team with the given abbreviation, or 0 if it isn't playing
    pub fn score_for(&self, abbr: &str) -> u32 {
        if self.home.abbr.eq_ignore_ascii_case(abbr) {
            self.home.score
        } else if self.away.abbr.eq_ignore_ascii_case(abbr) {
            self.away.score
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    pub abbr: String,
}

/// Response of the goals endpoint for a single game
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalsResponse {
    pub home: Option<TeamRef>,
    pub away: Option<TeamRef>,
    #[serde(default)]
    pub goals: Vec<GoalEvent>,
}

/// Everything the watcher and the bet evaluator look at for one poll
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub score: ScoreSnapshot,
    pub goals: Vec<GoalEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pick {
    Over,
    Under,
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pick::Over => write!(f, "over"),
            Pick::Under => write!(f, "under"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
    pub name: String,
}

/// One condition of a parlay, as written in the bets file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BetLeg {
    Moneyline {
        #[serde(rename = "teamTri")]
        team_tri: String,
    },
    Total {
        pick: Pick,
        line: f64,
        #[serde(rename = "teamTri", default, skip_serializing_if = "Option::is_none")]
        team_tri: Option<String>,
    },
    TeamTotal {
        pick: Pick,
        line: f64,
        #[serde(rename = "teamTri")]
        team_tri: String,
    },
    PlayerGoal {
        player: PlayerRef,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u32>,
    },
    FirstGoal {
        player: PlayerRef,
    },
    FirstTeamToScore {
        #[serde(rename = "teamTri")]
        team_tri: String,
    },
    /// Any leg whose type or shape we don't understand, kept as written
    #[serde(untagged)]
    Unknown(serde_json::Value),
}

impl BetLeg {
    /// Human readable description, e.g. "Team Total MTL over 2.5"
    pub fn label(&self) -> String {
        match self {
            BetLeg::Moneyline { team_tri } => format!("Moneyline {}", team_tri),
            BetLeg::Total {
                pick,
                line,
                team_tri: Some(team),
            }
            | BetLeg::TeamTotal {
                pick,
                line,
                team_tri: team,
            } => format!("Team Total {} {} {}", team, pick, line),
            BetLeg::Total {
                pick,
                line,
                team_tri: None,
            } => format!("Total {} {}", pick, line),
            BetLeg::PlayerGoal { player, count } => match count {
                Some(n) => format!("Anytime Goal: {} x{}", player.name, n),
                None => format!("Anytime Goal: {}", player.name),
            },
            BetLeg::FirstGoal { player } => format!("First Goal: {}", player.name),
            BetLeg::FirstTeamToScore { team_tri } => format!("First Team to Score: {}", team_tri),
            BetLeg::Unknown(_) => "Unknown leg".to_string(),
        }
    }
}

/// Legs that fail to parse become `BetLeg::Unknown` instead of rejecting the whole file
fn de_legs_lenient<'de, D>(deserializer: D) -> Result<Vec<BetLeg>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|value| {
            let leg = serde_json::from_value(value.clone()).unwrap_or(BetLeg::Unknown(value));
            if let BetLeg::Unknown(raw) = &leg {
                tracing::warn!(leg = %raw, "Unreadable bet leg, keeping it as unknown");
            }
            leg
        })
        .collect())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetKind {
    #[default]
    Parlay,
}

/// A wager made of one or more legs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: BetKind,
    #[serde(default, deserialize_with = "de_legs_lenient")]
    pub legs: Vec<BetLeg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stake: Option<f64>,
}

/// Contents of bets.json
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetsFile {
    pub bets: Vec<Bet>,
}

/// Settlement status of a leg or a whole bet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pending,
    Won,
    Lost,
    Void,
}

impl Verdict {
    pub fn is_settled(self) -> bool {
        !matches!(self, Verdict::Pending)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Pending => "PENDING",
            Verdict::Won => "WON",
            Verdict::Lost => "LOST",
            Verdict::Void => "VOID",
        };
        write!(f, "{}", s)
    }
}

/// Status of a single leg plus an optional live note ("1/2 goals")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegOutcome {
    pub status: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl LegOutcome {
    pub fn new(status: Verdict) -> Self {
        Self { status, note: None }
    }

    pub fn with_note(status: Verdict, note: impl Into<String>) -> Self {
        Self {
            status,
            note: Some(note.into()),
        }
    }
}
