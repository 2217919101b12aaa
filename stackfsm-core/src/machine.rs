//! Machine execution: deterministic dispatch and backtracking consumption.
//!
//! A [`Machine`] owns its current state, stacks and remaining input and
//! shares the compiled table through an `Arc`. `consume` explores every
//! path the table allows with an explicit work stack of [`Snapshot`]s and
//! adopts the first one that accepts. When none does, the machine rests on
//! the snapshot that got furthest through its workload.

use crate::config::EngineConfig;
use crate::definition::CompiledMachine;
use crate::error::FsmError;
use crate::snapshot::{RunStatus, Snapshot, StepEvent};
use crate::table::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Callback invoked for every committed transition.
pub type StepCallback = Box<dyn FnMut(&StepEvent) + Send>;

/// Handle returned by [`Machine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Input symbols for [`Machine::consume`].
///
/// Strings are split into one symbol per character; sequences keep their
/// elements as multi-character symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSequence(VecDeque<String>);

impl InputSequence {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> VecDeque<String> {
        self.0
    }
}

impl From<&str> for InputSequence {
    fn from(s: &str) -> Self {
        Self(s.chars().map(String::from).collect())
    }
}

impl From<String> for InputSequence {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<Vec<String>> for InputSequence {
    fn from(v: Vec<String>) -> Self {
        Self(v.into())
    }
}

impl From<Vec<&str>> for InputSequence {
    fn from(v: Vec<&str>) -> Self {
        Self(v.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for InputSequence {
    fn from(v: &[&str]) -> Self {
        Self(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for InputSequence {
    fn from(v: [&str; N]) -> Self {
        Self(v.iter().map(|s| s.to_string()).collect())
    }
}

/// Options for [`Machine::consume_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumeOptions {
    /// Reset the machine before consuming.
    pub reset: bool,
}

impl ConsumeOptions {
    pub fn reset() -> Self {
        Self { reset: true }
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    /// A snapshot accepted and was adopted.
    Accepted,
    /// Every path was explored without acceptance.
    Exhausted,
    /// The step cap was hit before the search finished.
    StepLimit,
}

/// Summary of the latest consume call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub status: SearchStatus,
    /// Snapshots taken off the work stack.
    pub steps: u64,
    /// Child snapshots created at branch points.
    pub branches: u64,
}

/// A running machine over a shared compiled table.
pub struct Machine {
    definition: Arc<CompiledMachine>,
    config: EngineConfig,
    state: String,
    stacks: Vec<Vec<String>>,
    input: VecDeque<String>,
    status: RunStatus,
    last_outcome: Option<SearchOutcome>,
    subscribers: Vec<(SubscriptionId, StepCallback)>,
    next_subscription: u64,
}

impl Machine {
    /// Creates a machine in the initial state with the default policy.
    pub fn new(definition: Arc<CompiledMachine>) -> Self {
        Self::with_config(definition, EngineConfig::default())
    }

    pub fn with_config(definition: Arc<CompiledMachine>, config: EngineConfig) -> Self {
        Self {
            state: definition.initial.clone(),
            stacks: vec![Vec::new(); definition.stack_count],
            input: VecDeque::new(),
            status: RunStatus::Exploring,
            last_outcome: None,
            subscribers: Vec::new(),
            next_subscription: 0,
            definition,
            config,
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Stack contents per channel, bottom first.
    pub fn stacks(&self) -> &[Vec<String>] {
        &self.stacks
    }

    /// Input left over by the latest consume call.
    pub fn input(&self) -> &VecDeque<String> {
        &self.input
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn definition(&self) -> &Arc<CompiledMachine> {
        &self.definition
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn last_outcome(&self) -> Option<SearchOutcome> {
        self.last_outcome
    }

    /// Returns true if the input is exhausted and the state accepts.
    pub fn in_accept_state(&self) -> bool {
        self.input.is_empty() && self.definition.is_accepting(&self.state)
    }

    /// Restores the initial state with empty stacks and input.
    pub fn reset(&mut self) -> &mut Self {
        self.state.clone_from(&self.definition.initial);
        self.stacks = vec![Vec::new(); self.definition.stack_count];
        self.input.clear();
        self.status = RunStatus::Exploring;
        self.last_outcome = None;
        self
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Registers a callback for committed transitions.
    pub fn subscribe(&mut self, callback: impl FnMut(&StepEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes a callback. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self, event: &StepEvent) {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(event);
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Fires the first entry for `label` that matches the current stack tops.
    ///
    /// The input queue is left untouched. A label with no matching entry is
    /// an error under `strict_actions` and is ignored otherwise.
    pub fn dispatch(&mut self, label: &str) -> Result<(), FsmError> {
        let definition = Arc::clone(&self.definition);
        let wanted = Symbol::parse(label);

        let found = {
            let tops: Vec<Option<&str>> = self
                .stacks
                .iter()
                .map(|s| s.last().map(String::as_str))
                .collect();
            definition
                .transitions_from(&self.state)
                .iter()
                .find(|e| e.filter.input == wanted && e.filter.reads_match(&tops))
        };

        let Some(entry) = found else {
            if self.config.strict_actions {
                if !definition.has_label(label) {
                    return Err(FsmError::UnknownAction {
                        action: label.to_string(),
                    });
                }
                return Err(FsmError::InvalidAction {
                    state: self.state.clone(),
                    action: label.to_string(),
                });
            }
            tracing::debug!(state = %self.state, action = label, "ignoring unmatched action");
            return Ok(());
        };

        entry.action.apply(&mut self.state, &mut self.stacks, None);
        self.status = if self.in_accept_state() {
            RunStatus::Accepted
        } else {
            RunStatus::Exploring
        };

        if !self.subscribers.is_empty() {
            let event = StepEvent {
                state: self.state.clone(),
                label: entry.label.clone(),
                stacks: self.stacks.clone(),
            };
            self.notify(&event);
        }

        Ok(())
    }

    // =========================================================================
    // Consumption
    // =========================================================================

    /// Consumes `input` along any accepting path.
    ///
    /// Replaces leftover input from previous calls. Never fails: a search
    /// without acceptance leaves the machine on its most exhausted snapshot
    /// with status [`RunStatus::Halted`].
    pub fn consume(&mut self, input: impl Into<InputSequence>) -> &mut Self {
        self.consume_with(input, ConsumeOptions::default())
    }

    pub fn consume_with(
        &mut self,
        input: impl Into<InputSequence>,
        options: ConsumeOptions,
    ) -> &mut Self {
        if options.reset {
            self.reset();
        }

        let definition = Arc::clone(&self.definition);
        let accept_states = &definition.accept_states;
        let step_limit = self.config.step_limit();

        let mut root = Snapshot::new(
            self.state.clone(),
            self.stacks.clone(),
            input.into().into_inner(),
        );
        if !self.subscribers.is_empty() {
            root = root.with_trail();
        }

        let mut steps = 0u64;
        let mut branches = 0u64;
        let mut accepted: Option<Snapshot> = None;

        let status = if root.is_accepting(accept_states) {
            accepted = Some(root.clone());
            SearchStatus::Accepted
        } else {
            let mut most_exhausted = root.clone();
            let mut pending = vec![root];

            let status = 'search: loop {
                let Some(mut snapshot) = pending.pop() else {
                    break SearchStatus::Exhausted;
                };
                if step_limit.is_some_and(|max| steps >= max) {
                    break SearchStatus::StepLimit;
                }
                steps += 1;

                let matches = {
                    let tops = snapshot.stack_tops();
                    definition.possible_transitions(&snapshot.state, &tops, snapshot.input_head())
                };

                tracing::trace!(
                    state = %snapshot.state,
                    remaining = snapshot.input.len(),
                    matches = matches.len(),
                    "exploring snapshot"
                );

                match matches.as_slice() {
                    [] => {
                        snapshot.halt();
                        keep_most_exhausted(&mut most_exhausted, &snapshot);
                    }
                    [entry] => {
                        snapshot.apply(entry);
                        if snapshot.is_accepting(accept_states) {
                            accepted = Some(snapshot);
                            break SearchStatus::Accepted;
                        }
                        keep_most_exhausted(&mut most_exhausted, &snapshot);
                        pending.push(snapshot);
                    }
                    _ => {
                        branches += matches.len() as u64;
                        for entry in &matches {
                            let mut child = snapshot.clone();
                            child.apply(entry);
                            if child.is_accepting(accept_states) {
                                accepted = Some(child);
                                break 'search SearchStatus::Accepted;
                            }
                            keep_most_exhausted(&mut most_exhausted, &child);
                            pending.push(child);
                        }
                    }
                }
            };

            if accepted.is_none() {
                self.adopt(most_exhausted, RunStatus::Halted);
            }
            status
        };

        if let Some(snapshot) = accepted {
            self.adopt(snapshot, RunStatus::Accepted);
        }

        let outcome = SearchOutcome {
            status,
            steps,
            branches,
        };
        tracing::debug!(
            outcome = ?outcome.status,
            steps,
            branches,
            state = %self.state,
            remaining = self.input.len(),
            "consume finished"
        );
        self.last_outcome = Some(outcome);
        self
    }

    /// Moves a snapshot into the machine and replays its trail.
    fn adopt(&mut self, mut snapshot: Snapshot, status: RunStatus) {
        let trail = snapshot.take_trail();
        self.state = snapshot.state;
        self.stacks = snapshot.stacks;
        self.input = snapshot.input;
        self.status = status;

        for event in &trail {
            self.notify(event);
        }
    }
}

/// Replaces `best` only when `candidate` has strictly less work left.
fn keep_most_exhausted(best: &mut Snapshot, candidate: &Snapshot) {
    if candidate.workload() < best.workload() {
        *best = candidate.clone();
    }
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("stacks", &self.stacks)
            .field("input", &self.input)
            .field("status", &self.status)
            .field("checksum", &self.definition.checksum)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
