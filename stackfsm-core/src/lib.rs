//! # stackfsm-core
//!
//! Rule compiler and execution engine for nondeterministic automata with
//! any number of stacks.
//!
//! This crate provides:
//! - Rule statement AST consumed from an external parser
//! - Rule unpacking and table merging with ambiguity checks
//! - Wildcard (`*` and `/regex/`) source states
//! - Deterministic dispatch and backtracking consumption
//! - A named registry of compiled machines

pub mod ast;
pub mod config;
pub mod definition;
pub mod error;
pub mod machine;
pub mod merge;
pub mod pattern;
pub mod registry;
pub mod snapshot;
pub mod table;
pub mod unpack;

pub use ast::{Direction, RuleStatement, StackOp, StateToken, Token, TransitionToken};
pub use config::{ConfigError, EngineConfig};
pub use definition::{compile, CompiledMachine};
pub use error::FsmError;
pub use machine::{
    ConsumeOptions, InputSequence, Machine, SearchOutcome, SearchStatus, SubscriptionId,
};
pub use registry::MachineRegistry;
pub use snapshot::{RunStatus, Snapshot, StepEvent};
pub use table::{Op, Symbol, TransitionAction, TransitionEntry, TransitionFilter, TransitionTable};
