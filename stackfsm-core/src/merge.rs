//! Table merging: unpacked statements into one compiled machine.
//!
//! Merging enforces the determinism invariant across statements, then
//! broadcasts wildcard rules onto the concrete states they match.

use crate::definition::CompiledMachine;
use crate::error::FsmError;
use crate::pattern::{SourcePattern, StateRef};
use crate::table::{
    Symbol, TransitionAction, TransitionEntry, TransitionFilter, TransitionKey, TransitionTable,
};
use crate::unpack::{Fact, UnpackedRule};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

/// Merges unpacked statements, given in source order.
pub fn merge_rules(rules: &[UnpackedRule]) -> Result<CompiledMachine, FsmError> {
    let stack_count = rules
        .iter()
        .flat_map(|r| r.facts.iter())
        .map(Fact::channels)
        .max()
        .unwrap_or(0);

    let mut states = BTreeSet::new();
    let mut labels = BTreeSet::new();
    for rule in rules {
        states.extend(rule.states.iter().cloned());
        labels.extend(rule.labels.iter().cloned());
    }

    // (state, annotated label) -> index of the statement that supplied it
    let mut owners = HashMap::new();
    let mut table = TransitionTable::new();
    let mut wildcards: Vec<(usize, &SourcePattern, &Fact)> = Vec::new();

    for rule in rules {
        for fact in &rule.facts {
            match &fact.source {
                StateRef::Concrete(state) => {
                    claim(&mut owners, state, fact, rule.index)?;
                    table.push(state, build_entry(fact, stack_count));
                }
                StateRef::Wildcard(pattern) => wildcards.push((rule.index, pattern, fact)),
            }
        }
    }

    let mut broadcast_owners = HashMap::new();
    let mut broadcasts = 0usize;
    for state in &states {
        for (index, pattern, fact) in &wildcards {
            if !pattern.matches(state) {
                continue;
            }
            if owners.contains_key(&(state.clone(), fact.key())) {
                tracing::trace!(
                    state = %state,
                    pattern = %pattern,
                    label = %fact.key(),
                    "explicit transition shadows wildcard"
                );
                continue;
            }
            claim(&mut broadcast_owners, state, fact, *index)?;
            table.push(state, build_entry(fact, stack_count));
            broadcasts += 1;
        }
    }
    if !wildcards.is_empty() {
        tracing::debug!(
            rules = wildcards.len(),
            broadcasts,
            "resolved wildcard source rules"
        );
    }

    let mut initial: Option<&String> = None;
    for rule in rules {
        if let Some(candidate) = &rule.initial {
            match initial {
                Some(first) if first != candidate => {
                    return Err(FsmError::MultipleInitialStates {
                        first: first.clone(),
                        second: candidate.clone(),
                    });
                }
                Some(_) => {}
                None => initial = Some(candidate),
            }
        }
    }
    let initial = initial.ok_or(FsmError::NoInitialState)?.clone();

    let accept_states: BTreeSet<String> = rules
        .iter()
        .flat_map(|r| r.accepting.iter().cloned())
        .collect();

    CompiledMachine::from_parts(initial, table, accept_states, stack_count, states, labels)
}

/// Records that statement `index` supplies `fact` from `state`, failing if
/// another statement already did.
fn claim(
    owners: &mut HashMap<(String, TransitionKey), usize>,
    state: &str,
    fact: &Fact,
    index: usize,
) -> Result<(), FsmError> {
    let key = fact.key();
    match owners.entry((state.to_string(), key)) {
        Entry::Occupied(o) if *o.get() != index => Err(FsmError::AmbiguousTransition {
            state: state.to_string(),
            label: o.key().1.to_string(),
        }),
        Entry::Occupied(_) => Ok(()),
        Entry::Vacant(v) => {
            v.insert(index);
            Ok(())
        }
    }
}

/// Pads the fact's annotations to `stack_count` channels and builds the entry.
fn build_entry(fact: &Fact, stack_count: usize) -> TransitionEntry {
    let mut reads = fact.reads.clone();
    reads.resize(stack_count, Symbol::Epsilon);
    let mut writes = fact.writes.clone();
    writes.resize(stack_count, None);

    let filter = TransitionFilter {
        input: fact.input.clone(),
        reads,
    };
    let action = TransitionAction::new(&fact.target, &filter, &writes);

    TransitionEntry {
        label: fact.label.clone(),
        filter,
        action,
    }
}
