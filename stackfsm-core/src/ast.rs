//! Rule statement types handed over by the DSL parser.
//!
//! Statements can also be supplied as JSON:
//!
//! ```json
//! [
//!   {"tokens": [
//!     {"type": "state", "name": "q0", "initial": true},
//!     {"type": "transition", "label": "a", "direction": "r",
//!      "stack_ops": [{"read": "_", "write": "a"}]},
//!     {"type": "state", "name": "q0"}
//!   ]},
//!   {"tokens": [
//!     {"type": "state", "name": "q0"},
//!     {"type": "transition", "label": "_", "direction": "r"},
//!     {"type": "state", "name": "q1", "accepting": true}
//!   ]}
//! ]
//! ```

use serde::{Deserialize, Serialize};

/// The epsilon symbol.
pub const EPSILON: &str = "_";

/// Reserved source marker matching every concrete state.
pub const CATCH_ALL: &str = "*";

/// Arrow direction of a transition token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// `-f>`: left state to right state.
    #[serde(rename = "r")]
    Right,
    /// `<f-`: right state to left state.
    #[serde(rename = "l")]
    Left,
    /// `<f>`: both ways.
    #[serde(rename = "lr")]
    Both,
}

/// Read/write annotation for one stack channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackOp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<String>,
}

impl StackOp {
    pub fn new(read: Option<&str>, write: Option<&str>) -> Self {
        Self {
            read: read.map(str::to_string),
            write: write.map(str::to_string),
        }
    }
}

/// A state reference inside a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateToken {
    /// Concrete name, `/regex/` or `*`.
    pub name: String,

    #[serde(default)]
    pub initial: bool,

    #[serde(default)]
    pub accepting: bool,
}

impl StateToken {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            initial: false,
            accepting: false,
        }
    }

    /// Marks the state as the initial state.
    pub fn initial(mut self) -> Self {
        self.initial = true;
        self
    }

    /// Marks the state as accepting.
    pub fn accepting(mut self) -> Self {
        self.accepting = true;
        self
    }
}

impl From<&str> for StateToken {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StateToken {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A labelled arrow between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionToken {
    /// Input symbol consumed by the transition (`_` for epsilon).
    pub label: String,

    pub direction: Direction,

    /// Per-channel stack annotations, indexed by channel.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack_ops: Vec<StackOp>,
}

impl TransitionToken {
    pub fn new(label: impl Into<String>, direction: Direction) -> Self {
        Self {
            label: label.into(),
            direction,
            stack_ops: Vec::new(),
        }
    }

    pub fn right(label: impl Into<String>) -> Self {
        Self::new(label, Direction::Right)
    }

    pub fn left(label: impl Into<String>) -> Self {
        Self::new(label, Direction::Left)
    }

    pub fn both(label: impl Into<String>) -> Self {
        Self::new(label, Direction::Both)
    }

    /// Appends the annotation for the next stack channel.
    pub fn with_stack(mut self, read: Option<&str>, write: Option<&str>) -> Self {
        self.stack_ops.push(StackOp::new(read, write));
        self
    }
}

/// One token of a rule statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Token {
    State(StateToken),
    Transition(TransitionToken),
}

/// One `;`-terminated rule: alternating state and transition tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStatement {
    pub tokens: Vec<Token>,
}

impl RuleStatement {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    pub fn builder() -> RuleStatementBuilder {
        RuleStatementBuilder::default()
    }
}

/// Incremental construction of a [`RuleStatement`].
#[derive(Debug, Default)]
pub struct RuleStatementBuilder {
    tokens: Vec<Token>,
}

impl RuleStatementBuilder {
    pub fn state(mut self, state: impl Into<StateToken>) -> Self {
        self.tokens.push(Token::State(state.into()));
        self
    }

    pub fn transition(mut self, transition: TransitionToken) -> Self {
        self.tokens.push(Token::Transition(transition));
        self
    }

    /// Shorthand for a right arrow without stack annotations.
    pub fn to(self, label: &str, state: impl Into<StateToken>) -> Self {
        self.transition(TransitionToken::right(label)).state(state)
    }

    pub fn build(self) -> RuleStatement {
        RuleStatement::new(self.tokens)
    }
}
