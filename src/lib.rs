//! stackfsm - rule-compiled multi-stack automata
//!
//! Compiles parsed rule statements into a transition table and runs it as
//! a nondeterministic machine with any number of stacks.
//!
//! ```
//! use stackfsm::{compile, Machine, RuleStatement, StateToken};
//! use std::sync::Arc;
//!
//! let rules = [RuleStatement::builder()
//!     .state(StateToken::new("s0").initial())
//!     .to("0", "s0")
//!     .to("1", "s0")
//!     .to("1", StateToken::new("s1").accepting())
//!     .build()];
//!
//! let mut machine = Machine::new(Arc::new(compile(&rules)?));
//! assert!(machine.consume("0011").in_accept_state());
//! # Ok::<(), stackfsm::FsmError>(())
//! ```

pub use stackfsm_core::*;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Once};
    use tracing_subscriber::EnvFilter;

    static TRACING: Once = Once::new();

    fn init_tracing() {
        TRACING.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
                )
                .with_test_writer()
                .try_init();
        });
    }

    fn state(name: &str) -> serde_json::Value {
        json!({"type": "state", "name": name})
    }

    fn arrow(label: &str, direction: &str) -> serde_json::Value {
        json!({"type": "transition", "label": label, "direction": direction})
    }

    #[test]
    fn test_json_rules_end_to_end() {
        init_tracing();

        let rules = json!([
            {"tokens": [
                {"type": "state", "name": "locked", "initial": true},
                arrow("coin", "r"),
                state("unlocked"),
                arrow("push", "r"),
                {"type": "state", "name": "locked", "accepting": true}
            ]},
            {"tokens": [state("*"), arrow("kick", "r"), state("broken")]}
        ]);

        let registry = MachineRegistry::new();
        let statements: Vec<RuleStatement> = serde_json::from_value(rules).unwrap();
        registry.register("turnstile", &statements).unwrap();

        let mut machine = registry.spawn("turnstile", EngineConfig::default()).unwrap();
        assert!(machine.consume(["coin", "push"]).in_accept_state());
        assert_eq!(machine.consume(["coin", "kick"]).state(), "broken");
        assert!(machine.input().is_empty());
        assert!(!machine.in_accept_state());

        // Compiled artifacts travel as JSON.
        let artifact = machine.definition().to_json().unwrap();
        let restored = Arc::new(CompiledMachine::from_json_str(&artifact).unwrap());
        let mut copy = Machine::new(restored);
        assert!(copy.consume(["coin", "push", "coin", "push"]).in_accept_state());
    }

    #[test]
    fn test_compile_errors_surface() {
        init_tracing();

        let rules = json!([
            {"tokens": [{"type": "state", "name": "s0", "initial": true}, arrow("f", "r"), state("s1")]},
            {"tokens": [state("s0"), arrow("f", "r"), state("s2")]}
        ]);

        let err = CompiledMachine::from_json(&rules).unwrap_err();
        assert_eq!(err.error_code(), "AMBIGUOUS_TRANSITION");
        assert_eq!(
            err.to_string(),
            "Multiple possible paths from state 's0' via transition 'f'"
        );
    }
}
