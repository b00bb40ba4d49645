use crate::models::GoalEvent;
use crate::utils::event_key::goal_key;
use std::collections::HashSet;

/// Goals present in `next` that weren't in `previous`, compared by key.
/// Keeps the order of `next`.
pub fn diff_new_goals(previous: &[GoalEvent], next: &[GoalEvent]) -> Vec<GoalEvent> {
    let previous_keys: HashSet<String> = previous.iter().map(goal_key).collect();
    next.iter()
        .filter(|g| !previous_keys.contains(&goal_key(g)))
        .cloned()
        .collect()
}
