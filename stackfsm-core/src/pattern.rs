//! Source state references: concrete names and wildcard patterns.
//!
//! A state token written as `/regex/` or `*` does not name a state. It
//! broadcasts its transitions to every concrete state it matches once all
//! statements are merged.

use crate::ast::CATCH_ALL;
use crate::error::FsmError;
use regex::Regex;
use std::fmt;

/// A wildcard source state.
#[derive(Debug, Clone)]
pub enum SourcePattern {
    /// `*`: every concrete state.
    Any,
    /// `/…/`: concrete states whose name the regex finds a match in.
    Regex { source: String, regex: Regex },
}

impl SourcePattern {
    /// Returns true if the concrete state name is covered by this pattern.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            SourcePattern::Any => true,
            SourcePattern::Regex { regex, .. } => regex.is_match(name),
        }
    }

    /// Returns the pattern as written in the rule.
    pub fn as_str(&self) -> &str {
        match self {
            SourcePattern::Any => CATCH_ALL,
            SourcePattern::Regex { source, .. } => source,
        }
    }
}

impl fmt::Display for SourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state token resolved to either a concrete state or a wildcard.
#[derive(Debug, Clone)]
pub enum StateRef {
    Concrete(String),
    Wildcard(SourcePattern),
}

impl StateRef {
    /// Classifies a state token name.
    pub fn parse(name: &str) -> Result<Self, FsmError> {
        if name == CATCH_ALL {
            return Ok(StateRef::Wildcard(SourcePattern::Any));
        }

        if name.len() >= 2 && name.starts_with('/') && name.ends_with('/') {
            let body = &name[1..name.len() - 1];
            let regex = Regex::new(body).map_err(|e| FsmError::InvalidPattern {
                pattern: name.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(StateRef::Wildcard(SourcePattern::Regex {
                source: name.to_string(),
                regex,
            }));
        }

        Ok(StateRef::Concrete(name.to_string()))
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, StateRef::Wildcard(_))
    }

    /// Returns the name or pattern text as written.
    pub fn as_str(&self) -> &str {
        match self {
            StateRef::Concrete(name) => name,
            StateRef::Wildcard(pattern) => pattern.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_name() {
        let r = StateRef::parse("s0").unwrap();
        assert!(!r.is_wildcard());
        assert_eq!(r.as_str(), "s0");
    }

    #[test]
    fn test_regex_pattern() {
        let r = StateRef::parse("/^s[0-9]/").unwrap();
        match r {
            StateRef::Wildcard(p) => {
                assert!(p.matches("s0"));
                assert!(p.matches("s12"));
                assert!(!p.matches("t1"));
                assert!(!p.matches("bar"));
                assert_eq!(p.as_str(), "/^s[0-9]/");
            }
            StateRef::Concrete(_) => panic!("expected wildcard"),
        }
    }

    #[test]
    fn test_catch_all() {
        match StateRef::parse("*").unwrap() {
            StateRef::Wildcard(p) => {
                assert!(p.matches("anything"));
                assert_eq!(p.to_string(), "*");
            }
            StateRef::Concrete(_) => panic!("expected wildcard"),
        }
    }

    #[test]
    fn test_lone_slash_is_concrete() {
        assert!(!StateRef::parse("/").unwrap().is_wildcard());
    }

    #[test]
    fn test_invalid_regex() {
        let result = StateRef::parse("/s[0-/");
        assert!(matches!(result, Err(FsmError::InvalidPattern { .. })));
    }
}
