use crate::models::{Bet, BetLeg, GameSnapshot, GoalEvent, LegOutcome, Pick, ScoreSnapshot, Verdict};
use serde::Serialize;

/// Substrings of a (lowercased) state that mean the game is over
const FINAL_MARKERS: &[&str] = &["final", "game over", "final overtime", "final shootout"];

/// States of a game that won't be played (or finished) today
const OFF_STATES: &[&str] = &["off", "postponed", "cancelled"];

fn is_final(state: &str) -> bool {
    let state = state.to_lowercase();
    FINAL_MARKERS.iter().any(|m| state.contains(m))
}

fn is_off(state: &str) -> bool {
    let state = state.to_lowercase();
    state.contains("off") || OFF_STATES.contains(&state.as_str())
}

fn same_name(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| a.to_lowercase() == b.to_lowercase())
}

/// Winner's abbreviation once the game is final, None while live or tied
fn final_winner(score: &ScoreSnapshot) -> Option<&str> {
    if !is_final(score.state()) || score.home.score == score.away.score {
        return None;
    }
    if score.home.score > score.away.score {
        Some(score.home.abbr.as_str())
    } else {
        Some(score.away.abbr.as_str())
    }
}

fn count_goals_by_player(goals: &[GoalEvent], full_name: &str) -> u32 {
    goals
        .iter()
        .filter(|g| same_name(g.scorer_name(), full_name))
        .count() as u32
}

fn first_goal_matches(goals: &[GoalEvent], matches: impl Fn(&GoalEvent) -> bool) -> LegOutcome {
    match goals.first() {
        None => LegOutcome::new(Verdict::Pending),
        Some(first) if matches(first) => LegOutcome::new(Verdict::Won),
        Some(_) => LegOutcome::new(Verdict::Lost),
    }
}

fn total_outcome(pick: Pick, line: f64, value: u32, note: String) -> LegOutcome {
    let value = f64::from(value);
    let won = match pick {
        Pick::Over => value > line,
        Pick::Under => value < line,
    };
    let status = if won { Verdict::Won } else { Verdict::Lost };
    LegOutcome::with_note(status, note)
}

fn team_total(score: &ScoreSnapshot, pick: Pick, line: f64, team: &str) -> LegOutcome {
    let team = team.to_uppercase();
    let value = score.score_for(&team);
    total_outcome(
        pick,
        line,
        value,
        format!("Final {}: {} vs line {}", team, value, line),
    )
}

/// Settle one leg against the latest score and goals.
///
/// Pure: the same inputs always give the same outcome. Totals are compared
/// against the running score even before the final horn, so a live total can
/// flip between WON and LOST until the game ends.
pub fn evaluate_leg(leg: &BetLeg, score: &ScoreSnapshot, goals: &[GoalEvent]) -> LegOutcome {
    let result = match leg {
        BetLeg::Moneyline { team_tri } => match final_winner(score) {
            Some(winner) if winner.eq_ignore_ascii_case(team_tri) => LegOutcome::new(Verdict::Won),
            Some(_) => LegOutcome::new(Verdict::Lost),
            None => LegOutcome::with_note(
                Verdict::Pending,
                format!(
                    "Current: {} {} – {} {}",
                    score.away.abbr, score.away.score, score.home.score, score.home.abbr
                ),
            ),
        },

        BetLeg::Total {
            pick,
            line,
            team_tri: Some(team),
        }
        | BetLeg::TeamTotal {
            pick,
            line,
            team_tri: team,
        } => team_total(score, *pick, *line, team),

        BetLeg::Total {
            pick,
            line,
            team_tri: None,
        } => {
            let total = score.total();
            total_outcome(
                *pick,
                *line,
                total,
                format!("Final total: {} vs line {}", total, line),
            )
        }

        BetLeg::PlayerGoal { player, count } => {
            let need = count.unwrap_or(1).max(1);
            let have = count_goals_by_player(goals, &player.name);
            let status = if have >= need {
                Verdict::Won
            } else if is_off(score.state()) {
                Verdict::Lost
            } else {
                Verdict::Pending
            };
            LegOutcome::with_note(status, format!("{}/{} goals", have, need))
        }

        BetLeg::FirstGoal { player } => {
            first_goal_matches(goals, |g| same_name(g.scorer_name(), &player.name))
        }

        BetLeg::FirstTeamToScore { team_tri } => {
            first_goal_matches(goals, |g| same_name(g.scorer_team(), team_tri))
        }

        BetLeg::Unknown(_) => LegOutcome::with_note(Verdict::Void, "Unknown leg type"),
    };

    // A game that won't be played can't leave a leg open forever
    if result.status == Verdict::Pending && is_off(score.state()) {
        return LegOutcome::with_note(Verdict::Lost, "Game is OFF");
    }
    result
}

/// Combine leg verdicts into the parlay verdict.
///
/// Order matters: all-VOID is VOID, then any LOST loses, then WON/VOID wins.
pub fn rollup(verdicts: &[Verdict]) -> Verdict {
    if verdicts.iter().all(|v| *v == Verdict::Void) {
        Verdict::Void
    } else if verdicts.iter().any(|v| *v == Verdict::Lost) {
        Verdict::Lost
    } else if verdicts
        .iter()
        .all(|v| matches!(v, Verdict::Won | Verdict::Void))
    {
        Verdict::Won
    } else {
        Verdict::Pending
    }
}

/// One evaluated leg, ready to display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegReport {
    pub label: String,
    pub leg: BetLeg,
    #[serde(flatten)]
    pub outcome: LegOutcome,
}

/// A bet with every leg evaluated and the parlay verdict derived from them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetReport {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stake: Option<f64>,
    pub status: Verdict,
    pub legs: Vec<LegReport>,
}

impl BetReport {
    pub fn format(&self) -> String {
        let legs: Vec<String> = self
            .legs
            .iter()
            .map(|l| match &l.outcome.note {
                Some(note) => format!("{} [{}] ({})", l.label, l.outcome.status, note),
                None => format!("{} [{}]", l.label, l.outcome.status),
            })
            .collect();
        format!("{}: {} | {}", self.id, self.status, legs.join(" | "))
    }
}

pub fn evaluate_bet(bet: &Bet, score: &ScoreSnapshot, goals: &[GoalEvent]) -> BetReport {
    let legs: Vec<LegReport> = bet
        .legs
        .iter()
        .map(|leg| LegReport {
            label: leg.label(),
            leg: leg.clone(),
            outcome: evaluate_leg(leg, score, goals),
        })
        .collect();
    let verdicts: Vec<Verdict> = legs.iter().map(|l| l.outcome.status).collect();

    BetReport {
        id: bet.id.clone(),
        stake: bet.stake,
        status: rollup(&verdicts),
        legs,
    }
}

/// Evaluate every bet against the same snapshot
pub fn evaluate_bets(bets: &[Bet], snapshot: &GameSnapshot) -> Vec<BetReport> {
    bets.iter()
        .map(|bet| evaluate_bet(bet, &snapshot.score, &snapshot.goals))
        .collect()
}
