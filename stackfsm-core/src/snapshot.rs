//! Execution snapshots explored by the backtracking search.

use crate::table::TransitionEntry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Still has transitions to try.
    #[default]
    Exploring,
    /// No transition matched the remaining input.
    Halted,
    /// Input exhausted in an accept state.
    Accepted,
}

/// One committed transition, as reported to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    /// State after the transition.
    pub state: String,

    /// Label of the transition that fired.
    pub label: String,

    /// Stack contents after the transition, bottom first.
    pub stacks: Vec<Vec<String>>,
}

/// Independently owned copy of a machine's mutable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: String,
    pub stacks: Vec<Vec<String>>,
    pub input: VecDeque<String>,
    pub status: RunStatus,

    /// Transitions applied since the search started; only kept when
    /// someone is listening.
    trail: Option<Vec<StepEvent>>,
}

impl Snapshot {
    pub fn new(state: String, stacks: Vec<Vec<String>>, input: VecDeque<String>) -> Self {
        Self {
            state,
            stacks,
            input,
            status: RunStatus::Exploring,
            trail: None,
        }
    }

    /// Enables step recording for this snapshot and its clones.
    pub fn with_trail(mut self) -> Self {
        self.trail = Some(Vec::new());
        self
    }

    pub fn input_head(&self) -> Option<&str> {
        self.input.front().map(String::as_str)
    }

    /// Top of every stack channel, `None` for empty channels.
    pub fn stack_tops(&self) -> Vec<Option<&str>> {
        self.stacks
            .iter()
            .map(|s| s.last().map(String::as_str))
            .collect()
    }

    /// Remaining work: total stack depth plus remaining input.
    pub fn workload(&self) -> usize {
        self.stacks.iter().map(Vec::len).sum::<usize>() + self.input.len()
    }

    /// Fires `entry` on this snapshot.
    pub fn apply(&mut self, entry: &TransitionEntry) {
        entry
            .action
            .apply(&mut self.state, &mut self.stacks, Some(&mut self.input));

        if let Some(trail) = self.trail.as_mut() {
            trail.push(StepEvent {
                state: self.state.clone(),
                label: entry.label.clone(),
                stacks: self.stacks.clone(),
            });
        }
    }

    pub fn is_accepting(&self, accept_states: &BTreeSet<String>) -> bool {
        self.status != RunStatus::Halted
            && self.input.is_empty()
            && accept_states.contains(&self.state)
    }

    pub fn halt(&mut self) {
        self.status = RunStatus::Halted;
    }

    /// Takes the recorded steps, leaving an empty trail.
    pub fn take_trail(&mut self) -> Vec<StepEvent> {
        self.trail.as_mut().map(std::mem::take).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Symbol, TransitionAction, TransitionFilter};

    fn push_entry(label: &str, value: &str, target: &str) -> TransitionEntry {
        let filter = TransitionFilter {
            input: Symbol::parse(label),
            reads: vec![Symbol::Epsilon],
        };
        let action = TransitionAction::new(target, &filter, &[Some(value.to_string())]);
        TransitionEntry {
            label: label.to_string(),
            filter,
            action,
        }
    }

    fn snapshot(input: &str) -> Snapshot {
        Snapshot::new(
            "q0".to_string(),
            vec![Vec::new()],
            input.chars().map(String::from).collect(),
        )
    }

    #[test]
    fn test_workload_and_tops() {
        let mut s = snapshot("ab");
        assert_eq!(s.workload(), 2);
        assert_eq!(s.stack_tops(), vec![None]);
        assert_eq!(s.input_head(), Some("a"));

        s.apply(&push_entry("a", "x", "q1"));
        assert_eq!(s.state, "q1");
        assert_eq!(s.workload(), 2);
        assert_eq!(s.stack_tops(), vec![Some("x")]);
        assert_eq!(s.input_head(), Some("b"));
    }

    #[test]
    fn test_clone_does_not_alias() {
        let parent = snapshot("a");
        let mut child = parent.clone();
        child.apply(&push_entry("a", "x", "q1"));

        assert_eq!(parent.state, "q0");
        assert!(parent.stacks[0].is_empty());
        assert_eq!(parent.input.len(), 1);
        assert_eq!(child.stacks[0], vec!["x".to_string()]);
    }

    #[test]
    fn test_halted_never_accepts() {
        let accept: BTreeSet<String> = ["q0".to_string()].into_iter().collect();
        let mut s = snapshot("");
        assert!(s.is_accepting(&accept));
        s.halt();
        assert!(!s.is_accepting(&accept));
    }

    #[test]
    fn test_trail_only_when_enabled() {
        let entry = push_entry("a", "x", "q1");

        let mut silent = snapshot("a");
        silent.apply(&entry);
        assert!(silent.take_trail().is_empty());

        let mut recorded = snapshot("a").with_trail();
        recorded.apply(&entry);
        let trail = recorded.take_trail();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].state, "q1");
        assert_eq!(trail[0].label, "a");
        assert_eq!(trail[0].stacks, vec![vec!["x".to_string()]]);
        assert!(recorded.take_trail().is_empty());
    }
}
