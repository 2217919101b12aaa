//! Core error types.

use thiserror::Error;

/// Errors from compiling rule statements and driving machines.
#[derive(Debug, Error)]
pub enum FsmError {
    #[error("no initial state set; mark exactly one state as initial")]
    NoInitialState,

    #[error("multiple initial states: '{first}' and '{second}'")]
    MultipleInitialStates { first: String, second: String },

    #[error("Multiple possible paths from state '{state}' via transition '{label}'")]
    AmbiguousTransition { state: String, label: String },

    #[error("duplicate transition from state '{state}' via '{label}' within one statement")]
    DuplicateTransition { state: String, label: String },

    #[error("malformed rule statement #{index}: {reason}")]
    MalformedStatement { index: usize, reason: String },

    #[error("invalid state pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid use of wildcard '{pattern}': {reason}")]
    InvalidWildcardUse { pattern: String, reason: String },

    #[error("invalid action '{action}' from state '{state}'")]
    InvalidAction { state: String, action: String },

    #[error("unknown action '{action}'")]
    UnknownAction { action: String },

    #[error("machine not found: {name}")]
    MachineNotFound { name: String },

    #[error("machine already registered with different rules: {name}")]
    MachineExists { name: String },

    #[error("checksum mismatch: stored {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FsmError {
    /// Returns whether this error aborted a compilation.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            FsmError::NoInitialState
                | FsmError::MultipleInitialStates { .. }
                | FsmError::AmbiguousTransition { .. }
                | FsmError::DuplicateTransition { .. }
                | FsmError::MalformedStatement { .. }
                | FsmError::InvalidPattern { .. }
                | FsmError::InvalidWildcardUse { .. }
        )
    }

    /// Returns a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            FsmError::NoInitialState => "NO_INITIAL_STATE",
            FsmError::MultipleInitialStates { .. } => "MULTIPLE_INITIAL_STATES",
            FsmError::AmbiguousTransition { .. } => "AMBIGUOUS_TRANSITION",
            FsmError::DuplicateTransition { .. } => "DUPLICATE_TRANSITION",
            FsmError::MalformedStatement { .. } => "MALFORMED_STATEMENT",
            FsmError::InvalidPattern { .. } => "INVALID_PATTERN",
            FsmError::InvalidWildcardUse { .. } => "INVALID_WILDCARD_USE",
            FsmError::InvalidAction { .. } => "INVALID_ACTION",
            FsmError::UnknownAction { .. } => "UNKNOWN_ACTION",
            FsmError::MachineNotFound { .. } => "MACHINE_NOT_FOUND",
            FsmError::MachineExists { .. } => "MACHINE_EXISTS",
            FsmError::ChecksumMismatch { .. } => "CHECKSUM_MISMATCH",
            FsmError::Json(_) => "BAD_REQUEST",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message() {
        let err = FsmError::AmbiguousTransition {
            state: "s0".to_string(),
            label: "f".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Multiple possible paths from state 's0' via transition 'f'"
        );
        assert_eq!(err.error_code(), "AMBIGUOUS_TRANSITION");
    }

    #[test]
    fn test_compile_error_classification() {
        assert!(FsmError::NoInitialState.is_compile_error());
        assert!(!FsmError::UnknownAction {
            action: "f".to_string()
        }
        .is_compile_error());
    }
}
