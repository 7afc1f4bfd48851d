//! Policy engine
//!
//! Evaluates key requests against per-identity policy. A policy names the
//! CIDR ranges a caller may come from and the attribute checks its requests
//! must satisfy. Policies load once at startup and are immutable afterwards.

use crate::errors::{KeyGateError, Result};
use crate::policy::checks::{Check, CheckSpec};
use crate::policy::cidr::CidrMatcher;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use tracing::{debug, info};

/// A request under evaluation: where it came from and what it claimed.
#[derive(Debug, Clone)]
pub struct AccessRequest {
    /// Peer address from the transport layer, never from the payload
    pub remote_addr: IpAddr,
    /// String-keyed attributes parsed from the request body
    pub attributes: HashMap<String, String>,
}

impl AccessRequest {
    pub fn new(remote_addr: IpAddr) -> Self {
        Self {
            remote_addr,
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    /// Attribute lookup; absent attributes evaluate as the empty string.
    pub fn attribute(&self, key: &str) -> &str {
        self.attributes.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Outcome of policy evaluation, independent of the approval workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    Deny,
}

impl Decision {
    pub fn is_permit(&self) -> bool {
        matches!(self, Decision::Permit)
    }
}

/// One check entry or an ordered list of them. A list is a conjunction:
/// every entry must match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckSpecs {
    One(CheckSpec),
    Many(Vec<CheckSpec>),
}

impl CheckSpecs {
    fn iter(&self) -> impl Iterator<Item = &CheckSpec> {
        match self {
            CheckSpecs::One(spec) => std::slice::from_ref(spec).iter(),
            CheckSpecs::Many(specs) => specs.iter(),
        }
    }
}

/// Per-identity policy as written in the policy document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityPolicySpec {
    /// CIDR ranges the caller must come from. Absent means no range
    /// matches, which denies everything for this identity.
    #[serde(default)]
    pub cidr_ranges: Vec<String>,

    /// Attribute name -> check(s) that must all pass
    #[serde(default)]
    pub checks: HashMap<String, CheckSpecs>,
}

/// Policy document file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub version: u32,

    #[serde(default)]
    pub identities: HashMap<String, IdentityPolicySpec>,
}

impl PolicyDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            KeyGateError::ConfigError(format!("cannot read policy file {:?}: {}", path, e))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            KeyGateError::ConfigError(format!("cannot parse policy file {:?}: {}", path, e))
        })
    }
}

/// A compiled per-identity policy.
#[derive(Debug, Clone)]
pub struct IdentityPolicy {
    cidr: CidrMatcher,
    checks: HashMap<String, Vec<Check>>,
}

impl IdentityPolicy {
    fn compile(spec: &IdentityPolicySpec) -> Result<Self> {
        let cidr = CidrMatcher::parse(&spec.cidr_ranges)?;
        let mut checks = HashMap::new();
        for (attribute, specs) in &spec.checks {
            let compiled: Result<Vec<Check>> = specs.iter().map(Check::compile).collect();
            checks.insert(attribute.clone(), compiled?);
        }
        Ok(Self { cidr, checks })
    }
}

/// Policy engine: a compiled, immutable snapshot of all identity policies.
pub struct PolicyEngine {
    policies: HashMap<String, IdentityPolicy>,
}

impl PolicyEngine {
    /// Compile a policy document. Any malformed CIDR range or pattern fails
    /// the whole load.
    pub fn from_document(doc: &PolicyDocument) -> Result<Self> {
        let mut policies = HashMap::new();
        for (cn, spec) in &doc.identities {
            let policy = IdentityPolicy::compile(spec)
                .map_err(|e| KeyGateError::ConfigError(format!("policy for '{}': {}", cn, e)))?;
            if policy.cidr.is_empty() {
                info!(
                    "policy for '{}' has no cidr_ranges; it will deny all requests",
                    cn
                );
            }
            policies.insert(cn.clone(), policy);
        }
        Ok(Self { policies })
    }

    /// Load and compile policies from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let doc = PolicyDocument::load(path)?;
        let engine = Self::from_document(&doc)?;
        info!(
            "Loaded {} identity policies from {:?}",
            engine.policies.len(),
            path
        );
        Ok(engine)
    }

    pub fn has_policy(&self, cn: &str) -> bool {
        self.policies.contains_key(cn)
    }

    /// Decide whether `cn` is permitted to ask for its key with this
    /// request. Pure function over the policy snapshot; non-match is a
    /// normal outcome, not an error.
    pub fn decide(&self, cn: &str, request: &AccessRequest) -> Decision {
        let Some(policy) = self.policies.get(cn) else {
            debug!("no policy configured for '{}': deny", cn);
            return Decision::Deny;
        };

        // The address check is mandatory and runs first: the peer address
        // is the only metadata the caller cannot fabricate.
        if !policy.cidr.matches(request.remote_addr) {
            debug!(
                "'{}' from {} outside configured ranges: deny",
                cn, request.remote_addr
            );
            return Decision::Deny;
        }

        for (attribute, checks) in &policy.checks {
            let value = request.attribute(attribute);
            for check in checks {
                if !check.apply(value) {
                    debug!("'{}' failed check on attribute '{}': deny", cn, attribute);
                    return Decision::Deny;
                }
            }
        }

        debug!("'{}' from {} permitted", cn, request.remote_addr);
        Decision::Permit
    }
}
