//! Attribute checks
//!
//! Defines the checks a policy can apply to request attributes:
//! - Exact string comparison
//! - Pattern match, anchored at the start of the value
//! - A named built-in predicate from a small closed set
//!
//! Unknown check kinds cannot be represented: an unrecognized `type` tag
//! fails policy deserialization, so a typo in configuration denies at load
//! instead of silently permitting at runtime.

use crate::errors::{KeyGateError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A check as written in the policy document.
///
/// A bare JSON string is shorthand for an exact match:
/// `"nginx"` ≡ `{"type": "equals", "value": "nginx"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckSpec {
    Literal(String),
    Tagged(TaggedCheck),
}

/// The explicit, tagged form of a check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaggedCheck {
    /// Byte-exact, case-sensitive equality
    #[serde(rename = "equals")]
    Equals { value: String },

    /// Regex match that must begin at the start of the value
    #[serde(rename = "pattern")]
    Pattern { pattern: String },

    /// One of the named built-in predicates
    #[serde(rename = "builtin")]
    Builtin { name: BuiltinPredicate },
}

/// The closed set of predicate checks selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltinPredicate {
    /// Value is not the empty string
    NonEmpty,
    /// Value parses as an unsigned decimal number
    Numeric,
    /// Value looks like a hostname (alphanumerics, hyphens, dots)
    Hostname,
}

impl BuiltinPredicate {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinPredicate::NonEmpty => "non-empty",
            BuiltinPredicate::Numeric => "numeric",
            BuiltinPredicate::Hostname => "hostname",
        }
    }

    pub fn eval(&self, value: &str) -> bool {
        match self {
            BuiltinPredicate::NonEmpty => !value.is_empty(),
            BuiltinPredicate::Numeric => {
                !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
            }
            BuiltinPredicate::Hostname => {
                !value.is_empty()
                    && value
                        .bytes()
                        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
            }
        }
    }
}

/// A compiled check, ready to apply to request attribute values.
#[derive(Debug, Clone)]
pub enum Check {
    Equals(String),
    Pattern(Regex),
    Builtin(BuiltinPredicate),
}

impl Check {
    /// Compile a check spec. Pattern compilation failures are configuration
    /// errors raised at load time.
    pub fn compile(spec: &CheckSpec) -> Result<Self> {
        match spec {
            CheckSpec::Literal(value) => Ok(Check::Equals(value.clone())),
            CheckSpec::Tagged(TaggedCheck::Equals { value }) => Ok(Check::Equals(value.clone())),
            CheckSpec::Tagged(TaggedCheck::Pattern { pattern }) => {
                let regex = Regex::new(pattern).map_err(|e| KeyGateError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                Ok(Check::Pattern(regex))
            }
            CheckSpec::Tagged(TaggedCheck::Builtin { name }) => Ok(Check::Builtin(*name)),
        }
    }

    /// Apply this check to an observed value.
    ///
    /// Emits a trace line per comparison for the audit trail; the return
    /// value alone drives control flow.
    pub fn apply(&self, value: &str) -> bool {
        match self {
            Check::Equals(expected) => {
                let matched = expected == value;
                debug!(
                    "comparing '{}' and '{}' lexically: {}",
                    expected,
                    value,
                    if matched { "equal" } else { "not equal" }
                );
                matched
            }
            Check::Pattern(regex) => {
                // The match must begin at the start of the value; a hit
                // further in does not count.
                let matched = regex.find(value).map_or(false, |m| m.start() == 0);
                debug!(
                    "matching '{}' against pattern '{}': {}",
                    value,
                    regex.as_str(),
                    if matched { "matched" } else { "didn't match" }
                );
                matched
            }
            Check::Builtin(predicate) => {
                let matched = predicate.eval(value);
                debug!(
                    "evaluating '{}' through builtin '{}': {}",
                    value,
                    predicate.name(),
                    matched
                );
                matched
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(json: &str) -> Result<Check> {
        let spec: CheckSpec = serde_json::from_str(json).unwrap();
        Check::compile(&spec)
    }

    #[test]
    fn test_exact_match() {
        let check = compile("\"foo\"").unwrap();
        assert!(check.apply("foo"));
        assert!(!check.apply("bar"));
        assert!(!check.apply("Foo"));
    }

    #[test]
    fn test_tagged_equals() {
        let check = compile(r#"{"type": "equals", "value": "nginx"}"#).unwrap();
        assert!(check.apply("nginx"));
        assert!(!check.apply("nginx2"));
    }

    #[test]
    fn test_pattern_anchored_at_start() {
        let check = compile(r#"{"type": "pattern", "pattern": "^ab"}"#).unwrap();
        assert!(check.apply("abcdef"));
        assert!(!check.apply("xabc"));
    }

    #[test]
    fn test_unanchored_pattern_still_matches_from_start_only() {
        let check = compile(r#"{"type": "pattern", "pattern": "ab"}"#).unwrap();
        assert!(check.apply("abcdef"));
        // "ab" occurs at offset 1, which is not a match
        assert!(!check.apply("xabc"));
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        let result = compile(r#"{"type": "pattern", "pattern": "("}"#);
        assert!(matches!(result, Err(KeyGateError::InvalidPattern { .. })));
    }

    #[test]
    fn test_builtin_non_empty() {
        let check = compile(r#"{"type": "builtin", "name": "non-empty"}"#).unwrap();
        assert!(check.apply("x"));
        assert!(!check.apply(""));
    }

    #[test]
    fn test_builtin_numeric() {
        let check = compile(r#"{"type": "builtin", "name": "numeric"}"#).unwrap();
        assert!(check.apply("12345"));
        assert!(!check.apply("12a45"));
        assert!(!check.apply(""));
    }

    #[test]
    fn test_builtin_hostname() {
        let check = compile(r#"{"type": "builtin", "name": "hostname"}"#).unwrap();
        assert!(check.apply("web-01.internal"));
        assert!(!check.apply("web 01"));
        assert!(!check.apply(""));
    }

    #[test]
    fn test_unknown_check_kind_fails_deserialization() {
        let result = serde_json::from_str::<CheckSpec>(r#"{"type": "wizardry", "value": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_builtin_fails_deserialization() {
        let result =
            serde_json::from_str::<CheckSpec>(r#"{"type": "builtin", "name": "mystery"}"#);
        assert!(result.is_err());
    }
}
