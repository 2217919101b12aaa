//! Compiled machine definition.
//!
//! A `CompiledMachine` is the pure value produced by compilation: initial
//! state, transition table and accept set, plus the state/label
//! inventories recorded while unpacking. It carries no behavior and can be
//! cached, serialized and shared read-only between machines.

use crate::ast::RuleStatement;
use crate::error::FsmError;
use crate::merge::merge_rules;
use crate::table::{TransitionEntry, TransitionTable};
use crate::unpack::unpack_statement;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Validated transition table with its initial and accepting states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledMachine {
    /// Initial state for new machines.
    pub initial: String,

    /// Entries per source state.
    pub transitions: TransitionTable,

    /// States that accept when the input is exhausted.
    pub accept_states: BTreeSet<String>,

    /// Number of stack channels.
    pub stack_count: usize,

    /// Every concrete state named by the rules.
    pub states: BTreeSet<String>,

    /// Every transition label used by the rules.
    pub labels: BTreeSet<String>,

    /// CRC32C of the table for cache integrity checks.
    pub checksum: String,
}

/// The part of a machine covered by its checksum.
#[derive(Serialize)]
struct ChecksumView<'a> {
    initial: &'a str,
    transitions: &'a TransitionTable,
    accept_states: &'a BTreeSet<String>,
}

impl CompiledMachine {
    /// Compiles rule statements given in source order.
    pub fn compile(statements: &[RuleStatement]) -> Result<Self, FsmError> {
        let rules = statements
            .iter()
            .enumerate()
            .map(|(index, stmt)| unpack_statement(index, stmt))
            .collect::<Result<Vec<_>, _>>()?;

        let machine = merge_rules(&rules)?;

        tracing::debug!(
            statements = statements.len(),
            states = machine.states.len(),
            entries = machine.transitions.len(),
            channels = machine.stack_count,
            checksum = %machine.checksum,
            "compiled machine"
        );

        Ok(machine)
    }

    /// Compiles a JSON array of rule statements.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, FsmError> {
        let statements: Vec<RuleStatement> = serde_json::from_value(json.clone())?;
        Self::compile(&statements)
    }

    /// Assembles a machine from merged parts and computes its checksum.
    pub(crate) fn from_parts(
        initial: String,
        transitions: TransitionTable,
        accept_states: BTreeSet<String>,
        stack_count: usize,
        states: BTreeSet<String>,
        labels: BTreeSet<String>,
    ) -> Result<Self, FsmError> {
        let mut machine = Self {
            initial,
            transitions,
            accept_states,
            stack_count,
            states,
            labels,
            checksum: String::new(),
        };
        machine.checksum = machine.compute_checksum()?;
        Ok(machine)
    }

    /// CRC32C over the initial state, table and accept set.
    fn compute_checksum(&self) -> Result<String, FsmError> {
        let json_bytes = serde_json::to_vec(&ChecksumView {
            initial: &self.initial,
            transitions: &self.transitions,
            accept_states: &self.accept_states,
        })?;
        Ok(format!("{:08x}", crc32c::crc32c(&json_bytes)))
    }

    /// Serializes the compiled machine.
    pub fn to_json(&self) -> Result<String, FsmError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restores a compiled machine serialized with [`to_json`](Self::to_json).
    ///
    /// The stored checksum must match the restored table.
    pub fn from_json_str(s: &str) -> Result<Self, FsmError> {
        let machine: Self = serde_json::from_str(s)?;
        let actual = machine.compute_checksum()?;
        if actual != machine.checksum {
            return Err(FsmError::ChecksumMismatch {
                expected: machine.checksum,
                actual,
            });
        }
        Ok(machine)
    }

    /// Matching entries for the given state, stack tops and input head.
    pub fn possible_transitions(
        &self,
        state: &str,
        tops: &[Option<&str>],
        head: Option<&str>,
    ) -> Vec<&TransitionEntry> {
        self.transitions.possible_transitions(state, tops, head)
    }

    /// All entries leaving `state`.
    pub fn transitions_from(&self, state: &str) -> &[TransitionEntry] {
        self.transitions.entries(state)
    }

    /// Distinct labels usable from `state`.
    pub fn labels_from(&self, state: &str) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for entry in self.transitions_from(state) {
            if !labels.contains(&entry.label.as_str()) {
                labels.push(&entry.label);
            }
        }
        labels
    }

    pub fn is_accepting(&self, state: &str) -> bool {
        self.accept_states.contains(state)
    }

    /// Returns true if the rules name this concrete state.
    pub fn has_state(&self, state: &str) -> bool {
        self.states.contains(state)
    }

    /// Returns true if any rule uses this transition label.
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

/// Compiles rule statements into a [`CompiledMachine`].
pub fn compile(statements: &[RuleStatement]) -> Result<CompiledMachine, FsmError> {
    CompiledMachine::compile(statements)
}
