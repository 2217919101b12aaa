//! Rule unpacking: one statement into directed transition facts.
//!
//! `s0 -a> s1 <b> s2` unpacks triple by triple into `s0 -a> s1`,
//! `s1 -b> s2` and `s2 -b> s1`. Stack annotations are kept per channel at
//! the length the author wrote them; the merger pads them once the
//! channel count of the whole rule set is known.

use crate::ast::{Direction, RuleStatement, StackOp, Token, TransitionToken, EPSILON};
use crate::error::FsmError;
use crate::pattern::StateRef;
use crate::table::{Symbol, TransitionKey};

/// A directed transition produced by unpacking.
#[derive(Debug, Clone)]
pub struct Fact {
    /// Effective source after direction expansion.
    pub source: StateRef,
    /// Label as written.
    pub label: String,
    pub input: Symbol,
    pub reads: Vec<Symbol>,
    pub writes: Vec<Option<String>>,
    pub target: String,
}

impl Fact {
    /// Annotated label used for conflict checks.
    pub fn key(&self) -> TransitionKey {
        TransitionKey::new(self.input.clone(), &self.reads, &self.writes)
    }

    /// Number of stack channels this fact annotates.
    pub fn channels(&self) -> usize {
        self.reads.len().max(self.writes.len())
    }
}

/// Result of unpacking one statement.
#[derive(Debug, Clone, Default)]
pub struct UnpackedRule {
    /// Position of the statement in source order.
    pub index: usize,
    pub facts: Vec<Fact>,
    /// Concrete state names in order of first appearance.
    pub states: Vec<String>,
    /// Transition labels in order of first appearance.
    pub labels: Vec<String>,
    pub initial: Option<String>,
    pub accepting: Vec<String>,
}

impl UnpackedRule {
    fn record_state(&mut self, name: &str) {
        if !self.states.iter().any(|s| s == name) {
            self.states.push(name.to_string());
        }
    }

    fn record_label(&mut self, label: &str) {
        if !self.labels.iter().any(|l| l == label) {
            self.labels.push(label.to_string());
        }
    }

    fn add_fact(&mut self, fact: Fact) -> Result<(), FsmError> {
        let key = fact.key();
        let duplicate = self.facts.iter().any(|f| {
            f.source.as_str() == fact.source.as_str() && f.target == fact.target && f.key() == key
        });
        if duplicate {
            return Err(FsmError::DuplicateTransition {
                state: fact.source.as_str().to_string(),
                label: key.to_string(),
            });
        }
        self.facts.push(fact);
        Ok(())
    }
}

/// Unpacks the statement at position `index`.
pub fn unpack_statement(index: usize, stmt: &RuleStatement) -> Result<UnpackedRule, FsmError> {
    let malformed = |reason: &str| FsmError::MalformedStatement {
        index,
        reason: reason.to_string(),
    };

    if stmt.tokens.is_empty() {
        return Err(malformed("empty statement"));
    }

    // Resolve every state token up front; odd positions must be transitions.
    let mut states = Vec::with_capacity(stmt.tokens.len() / 2 + 1);
    let mut transitions = Vec::with_capacity(stmt.tokens.len() / 2);
    for (i, token) in stmt.tokens.iter().enumerate() {
        match (i % 2 == 0, token) {
            (true, Token::State(s)) => states.push((StateRef::parse(&s.name)?, s)),
            (false, Token::Transition(t)) => transitions.push(t),
            (true, Token::Transition(t)) => {
                return Err(malformed(&format!(
                    "expected a state at position {}, found transition '{}'",
                    i, t.label
                )))
            }
            (false, Token::State(s)) => {
                return Err(malformed(&format!(
                    "expected a transition at position {}, found state '{}'",
                    i, s.name
                )))
            }
        }
    }
    if states.len() != transitions.len() + 1 {
        return Err(malformed("statement must end with a state"));
    }

    let mut rule = UnpackedRule {
        index,
        ..Default::default()
    };

    for (state_ref, token) in &states {
        match state_ref {
            StateRef::Concrete(name) => rule.record_state(name),
            StateRef::Wildcard(pattern) => {
                if token.initial || token.accepting {
                    return Err(FsmError::InvalidWildcardUse {
                        pattern: pattern.to_string(),
                        reason: "wildcard states cannot be initial or accepting".to_string(),
                    });
                }
            }
        }

        if token.initial {
            match &rule.initial {
                Some(first) if first != &token.name => {
                    return Err(FsmError::MultipleInitialStates {
                        first: first.clone(),
                        second: token.name.clone(),
                    })
                }
                Some(_) => {}
                None => rule.initial = Some(token.name.clone()),
            }
        }
        if token.accepting && !rule.accepting.contains(&token.name) {
            rule.accepting.push(token.name.clone());
        }
    }

    for (i, transition) in transitions.iter().enumerate() {
        let left = &states[i].0;
        let right = &states[i + 1].0;
        rule.record_label(&transition.label);

        match transition.direction {
            Direction::Right => rule.add_fact(make_fact(left, transition, right)?)?,
            Direction::Left => rule.add_fact(make_fact(right, transition, left)?)?,
            Direction::Both => {
                rule.add_fact(make_fact(left, transition, right)?)?;
                rule.add_fact(make_fact(right, transition, left)?)?;
            }
        }
    }

    tracing::trace!(
        index,
        facts = rule.facts.len(),
        states = rule.states.len(),
        "unpacked rule statement"
    );

    Ok(rule)
}

fn make_fact(
    source: &StateRef,
    transition: &TransitionToken,
    target: &StateRef,
) -> Result<Fact, FsmError> {
    let target = match target {
        StateRef::Concrete(name) => name.clone(),
        StateRef::Wildcard(pattern) => {
            return Err(FsmError::InvalidWildcardUse {
                pattern: pattern.to_string(),
                reason: format!(
                    "wildcard cannot be the target of transition '{}'",
                    transition.label
                ),
            })
        }
    };

    Ok(Fact {
        source: source.clone(),
        label: transition.label.clone(),
        input: Symbol::parse(&transition.label),
        reads: transition.stack_ops.iter().map(read_symbol).collect(),
        writes: transition.stack_ops.iter().map(write_symbol).collect(),
        target,
    })
}

fn read_symbol(op: &StackOp) -> Symbol {
    op.read.as_deref().map(Symbol::parse).unwrap_or(Symbol::Epsilon)
}

fn write_symbol(op: &StackOp) -> Option<String> {
    op.write.clone().filter(|w| w != EPSILON)
}
