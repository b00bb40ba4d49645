use crate::models::GoalEvent;

/// Build a stable identity for a goal.
///
/// An id assigned by the backend wins. Before one exists, only fields that
/// never change once a goal is scored are used: game, period and scoring
/// team. Time in period and the running score get revised between polls, so
/// they stay out. Two goals by the same team in the same period that both lack
/// an id share a key.
pub fn goal_key(goal: &GoalEvent) -> String {
    if let Some(id) = &goal.id {
        return id.clone();
    }

    let period = goal.period.map(|p| p.to_string()).unwrap_or_default();
    format!(
        "{}|{}|{}",
        goal.game_pk.as_deref().unwrap_or_default(),
        period,
        goal.scorer_team().unwrap_or_default()
    )
}
