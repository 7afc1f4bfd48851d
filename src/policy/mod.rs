//! Policy evaluation for key requests
//!
//! This module provides:
//! - CIDR range matching over the request's peer address
//! - Attribute checks (exact, anchored pattern, built-in predicates)
//! - The policy engine that composes both into a permit/deny decision

pub mod checks;
pub mod cidr;
pub mod engine;

pub use checks::{BuiltinPredicate, Check, CheckSpec, TaggedCheck};
pub use cidr::CidrMatcher;
pub use engine::{
    AccessRequest, CheckSpecs, Decision, IdentityPolicy, IdentityPolicySpec, PolicyDocument,
    PolicyEngine,
};
