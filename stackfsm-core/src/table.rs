//! Transition table types and the matching primitive.

use crate::ast::EPSILON;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// An input or stack symbol requirement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Symbol {
    /// `_`: matches anything, including nothing, without consuming.
    Epsilon,
    Token(String),
}

impl Symbol {
    pub fn parse(s: &str) -> Self {
        if s == EPSILON {
            Symbol::Epsilon
        } else {
            Symbol::Token(s.to_string())
        }
    }

    pub fn is_epsilon(&self) -> bool {
        matches!(self, Symbol::Epsilon)
    }

    /// Returns true if this requirement accepts the given head/top value.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Symbol::Epsilon => true,
            Symbol::Token(t) => value == Some(t.as_str()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Symbol::Epsilon => EPSILON,
            Symbol::Token(t) => t,
        }
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        if s == EPSILON {
            Symbol::Epsilon
        } else {
            Symbol::Token(s)
        }
    }
}

impl From<Symbol> for String {
    fn from(s: Symbol) -> Self {
        match s {
            Symbol::Epsilon => EPSILON.to_string(),
            Symbol::Token(t) => t,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Matching predicate of a table entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionFilter {
    /// Required input head.
    pub input: Symbol,
    /// Required top per stack channel.
    pub reads: Vec<Symbol>,
}

impl TransitionFilter {
    /// Returns true if the filter accepts the given stack tops and input head.
    ///
    /// Channels missing from `tops` are treated as empty stacks.
    pub fn matches(&self, tops: &[Option<&str>], head: Option<&str>) -> bool {
        self.input.matches(head) && self.reads_match(tops)
    }

    /// Checks the stack requirements only.
    pub fn reads_match(&self, tops: &[Option<&str>]) -> bool {
        self.reads
            .iter()
            .enumerate()
            .all(|(ch, read)| read.matches(tops.get(ch).copied().flatten()))
    }
}

/// Engine operation emitted for a transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    SetState(String),
    ConsumeInput,
    PopStack(usize),
    PushStack(usize, String),
}

/// Effect of firing a matched filter, as an ordered op list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionAction {
    pub ops: Vec<Op>,
}

impl TransitionAction {
    /// Builds the op list: set state, consume, then pop/push per channel.
    pub fn new(target: &str, filter: &TransitionFilter, writes: &[Option<String>]) -> Self {
        let mut ops = vec![Op::SetState(target.to_string())];
        if !filter.input.is_epsilon() {
            ops.push(Op::ConsumeInput);
        }

        let channels = filter.reads.len().max(writes.len());
        for ch in 0..channels {
            if let Some(Symbol::Token(_)) = filter.reads.get(ch) {
                ops.push(Op::PopStack(ch));
            }
            if let Some(Some(value)) = writes.get(ch) {
                ops.push(Op::PushStack(ch, value.clone()));
            }
        }

        Self { ops }
    }

    /// Destination state.
    pub fn target(&self) -> &str {
        self.ops
            .iter()
            .find_map(|op| match op {
                Op::SetState(s) => Some(s.as_str()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Symbol pushed on `channel`, if any.
    pub fn write(&self, channel: usize) -> Option<&str> {
        self.ops.iter().find_map(|op| match op {
            Op::PushStack(ch, v) if *ch == channel => Some(v.as_str()),
            _ => None,
        })
    }

    /// Applies the ops. `input` is `None` when the caller drives the
    /// machine by dispatch and no input queue is involved.
    pub fn apply(
        &self,
        state: &mut String,
        stacks: &mut [Vec<String>],
        mut input: Option<&mut VecDeque<String>>,
    ) {
        for op in &self.ops {
            match op {
                Op::SetState(s) => state.clone_from(s),
                Op::ConsumeInput => {
                    if let Some(queue) = input.as_deref_mut() {
                        queue.pop_front();
                    }
                }
                Op::PopStack(ch) => {
                    if let Some(stack) = stacks.get_mut(*ch) {
                        stack.pop();
                    }
                }
                Op::PushStack(ch, v) => {
                    if let Some(stack) = stacks.get_mut(*ch) {
                        stack.push(v.clone());
                    }
                }
            }
        }
    }
}

/// Identity of a transition as written: input plus per-channel read/write.
///
/// Writes are part of the identity because rules are keyed by the label as
/// the author wrote it, annotations included: `f[a:x]` and `f[a:y]` are two
/// distinct transitions, not an ambiguity. Trailing channels without a read
/// requirement or write are dropped, so `f` and `f[_]` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransitionKey {
    pub input: Symbol,
    pub channels: Vec<(Symbol, Option<String>)>,
}

impl TransitionKey {
    pub fn new(input: Symbol, reads: &[Symbol], writes: &[Option<String>]) -> Self {
        let len = reads.len().max(writes.len());
        let mut channels: Vec<(Symbol, Option<String>)> = (0..len)
            .map(|ch| {
                (
                    reads.get(ch).cloned().unwrap_or(Symbol::Epsilon),
                    writes.get(ch).cloned().flatten(),
                )
            })
            .collect();

        while matches!(channels.last(), Some((Symbol::Epsilon, None))) {
            channels.pop();
        }

        Self { input, channels }
    }
}

impl fmt::Display for TransitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.input)?;
        if self.channels.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (i, (read, write)) in self.channels.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", read)?;
            if let Some(w) = write {
                write!(f, ":{}", w)?;
            }
        }
        f.write_str("]")
    }
}

/// One table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEntry {
    /// Transition label as written, before stack annotations.
    pub label: String,
    pub filter: TransitionFilter,
    pub action: TransitionAction,
}

impl TransitionEntry {
    /// Returns the annotated label of this entry.
    pub fn key(&self) -> TransitionKey {
        let writes: Vec<Option<String>> = (0..self.filter.reads.len())
            .map(|ch| self.action.write(ch).map(str::to_string))
            .collect();
        TransitionKey::new(self.filter.input.clone(), &self.filter.reads, &writes)
    }

    pub fn target(&self) -> &str {
        self.action.target()
    }
}

/// Entries per source state, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionTable {
    states: BTreeMap<String, Vec<TransitionEntry>>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, state: &str, entry: TransitionEntry) {
        self.states.entry(state.to_string()).or_default().push(entry);
    }

    /// Entries for `state`, empty if it has no outgoing transitions.
    pub fn entries(&self, state: &str) -> &[TransitionEntry] {
        self.states.get(state).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All entries of `state` matching the stack tops and input head, in
    /// table order. Epsilon-input entries are included alongside concrete
    /// ones.
    pub fn possible_transitions(
        &self,
        state: &str,
        tops: &[Option<&str>],
        head: Option<&str>,
    ) -> Vec<&TransitionEntry> {
        self.entries(state)
            .iter()
            .filter(|e| e.filter.matches(tops, head))
            .collect()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.states.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
