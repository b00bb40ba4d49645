pub mod bet_evaluator;
pub mod data;
pub mod event_key;
pub mod goal_diff;
pub mod seen_store;
pub mod transition;
pub mod watcher;
