//! Key gateway
//!
//! Orchestrates one key request end to end: parse the body, ask the policy
//! engine whether the caller may ask at all, then either hand out the key
//! (if this (cn, peer-address) pair was approved) or queue the request for
//! human review. The store and inventory are injected so the gateway can
//! run against in-memory fakes.

use crate::errors::{KeyGateError, Result};
use crate::keystore::KeyInventory;
use crate::policy::{AccessRequest, PolicyEngine};
use crate::store::{AuthStore, PendingApproval};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::info;

/// Receipt returned when a permitted request is queued for approval.
#[derive(Debug, Clone, Serialize)]
pub struct PendingReceipt {
    pub cn: String,
    pub ip: IpAddr,
    pub message: String,
}

/// What a key request resolves to, short of an error.
#[derive(Debug)]
pub enum GateOutcome {
    /// The caller is authorized: the key bytes
    Key(Vec<u8>),
    /// Permitted but not yet approved: queued for review
    Pending(PendingReceipt),
}

/// The gateway holding the three collaborators a request touches.
pub struct KeyGateway {
    policy: Arc<PolicyEngine>,
    store: Arc<dyn AuthStore>,
    inventory: Arc<dyn KeyInventory>,
}

impl KeyGateway {
    pub fn new(
        policy: Arc<PolicyEngine>,
        store: Arc<dyn AuthStore>,
        inventory: Arc<dyn KeyInventory>,
    ) -> Self {
        Self {
            policy,
            store,
            inventory,
        }
    }

    /// Handle one key request.
    ///
    /// `remote_addr` must come from the transport layer. The gateway never
    /// retries; a caller queued for approval re-submits the identical
    /// request after out-of-band approval and receives the key then.
    pub fn handle_request(
        &self,
        cn: &str,
        remote_addr: IpAddr,
        body: &[u8],
    ) -> Result<GateOutcome> {
        let attributes = parse_attributes(body)?;
        let request = AccessRequest {
            remote_addr,
            attributes,
        };

        if !self.policy.decide(cn, &request).is_permit() {
            return Err(KeyGateError::Forbidden(cn.to_string()));
        }

        if !self.inventory.contains(cn)? {
            return Err(KeyGateError::KeyNotFound(cn.to_string()));
        }

        if self.store.is_authorized(cn, remote_addr)? {
            info!("releasing key for '{}' to {}", cn, remote_addr);
            let key = self.inventory.read_key(cn)?;
            return Ok(GateOutcome::Key(key));
        }

        info!("'{}' from {} permitted but unapproved, queueing", cn, remote_addr);
        self.store
            .enqueue(PendingApproval::new(cn, remote_addr, request.attributes))?;

        Ok(GateOutcome::Pending(PendingReceipt {
            cn: cn.to_string(),
            ip: remote_addr,
            message: "submitted, come back later".to_string(),
        }))
    }
}

/// Parse the request body into string attributes. The body must be a JSON
/// object; scalar values are rendered to strings so policy checks can
/// compare them.
fn parse_attributes(body: &[u8]) -> Result<HashMap<String, String>> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| KeyGateError::BadRequest(format!("invalid JSON: {}", e)))?;

    let Value::Object(object) = value else {
        return Err(KeyGateError::BadRequest(
            "request body must be a JSON object".to_string(),
        ));
    };

    let mut attributes = HashMap::new();
    for (key, value) in object {
        let rendered = match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        attributes.insert(key, rendered);
    }
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeyStore;
    use crate::policy::PolicyDocument;
    use crate::store::MemoryAuthStore;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn gateway() -> (KeyGateway, Arc<MemoryAuthStore>) {
        let doc: PolicyDocument = serde_json::from_str(
            r#"{"identities": {"web": {
                "cidr_ranges": ["10.0.0.0/8"],
                "checks": {"service": "nginx"}
            }}}"#,
        )
        .unwrap();
        let policy = Arc::new(PolicyEngine::from_document(&doc).unwrap());

        let inventory = Arc::new(MemoryKeyStore::new());
        inventory.insert_key("web", b"-----KEY BYTES-----");

        let store = Arc::new(MemoryAuthStore::new());
        (
            KeyGateway::new(policy, store.clone(), inventory),
            store,
        )
    }

    const GOOD_BODY: &[u8] = br#"{"service": "nginx", "ip": "10.1.2.3"}"#;

    #[test]
    fn test_malformed_body_is_bad_request() {
        let (gw, _) = gateway();
        let result = gw.handle_request("web", addr("10.1.2.3"), b"{not json");
        assert!(matches!(result, Err(KeyGateError::BadRequest(_))));
    }

    #[test]
    fn test_non_object_body_is_bad_request() {
        let (gw, _) = gateway();
        let result = gw.handle_request("web", addr("10.1.2.3"), b"[1, 2, 3]");
        assert!(matches!(result, Err(KeyGateError::BadRequest(_))));
    }

    #[test]
    fn test_unconfigured_identity_is_forbidden() {
        let (gw, _) = gateway();
        let result = gw.handle_request("ghost", addr("10.1.2.3"), GOOD_BODY);
        assert!(matches!(result, Err(KeyGateError::Forbidden(_))));
    }

    #[test]
    fn test_address_outside_cidr_is_forbidden() {
        let (gw, _) = gateway();
        let result = gw.handle_request("web", addr("192.168.1.1"), GOOD_BODY);
        assert!(matches!(result, Err(KeyGateError::Forbidden(_))));
    }

    #[test]
    fn test_permitted_identity_without_key_material_is_not_found() {
        let doc: PolicyDocument = serde_json::from_str(
            r#"{"identities": {"orphan": {"cidr_ranges": ["10.0.0.0/8"]}}}"#,
        )
        .unwrap();
        let policy = Arc::new(PolicyEngine::from_document(&doc).unwrap());
        let gw = KeyGateway::new(
            policy,
            Arc::new(MemoryAuthStore::new()),
            Arc::new(MemoryKeyStore::new()),
        );

        let result = gw.handle_request("orphan", addr("10.1.2.3"), b"{}");
        assert!(matches!(result, Err(KeyGateError::KeyNotFound(_))));
    }

    #[test]
    fn test_approval_workflow_end_to_end() {
        let (gw, store) = gateway();
        let peer = addr("10.1.2.3");

        // permitted but never authorized: a receipt, and the queue shows it
        let outcome = gw.handle_request("web", peer, GOOD_BODY).unwrap();
        let GateOutcome::Pending(receipt) = outcome else {
            panic!("expected pending receipt");
        };
        assert_eq!(receipt.cn, "web");
        assert_eq!(receipt.ip, peer);

        let queued = store.list_pending().unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].cn, "web");
        assert_eq!(queued[0].ip, peer);
        assert_eq!(queued[0].payload.get("service").unwrap(), "nginx");

        // the approver grants the pair; the identical retry gets the key
        store.grant("web", peer).unwrap();
        let outcome = gw.handle_request("web", peer, GOOD_BODY).unwrap();
        let GateOutcome::Key(bytes) = outcome else {
            panic!("expected key bytes");
        };
        assert_eq!(bytes, b"-----KEY BYTES-----");
        assert!(store.list_pending().unwrap().is_empty());

        // a different source address is a different pair: still unapproved
        let outcome = gw.handle_request("web", addr("10.9.9.9"), GOOD_BODY).unwrap();
        assert!(matches!(outcome, GateOutcome::Pending(_)));
    }

    #[test]
    fn test_retry_before_grant_stays_pending_without_duplicates() {
        let (gw, store) = gateway();
        let peer = addr("10.1.2.3");

        for _ in 0..3 {
            let outcome = gw.handle_request("web", peer, GOOD_BODY).unwrap();
            assert!(matches!(outcome, GateOutcome::Pending(_)));
        }
        assert_eq!(store.list_pending().unwrap().len(), 1);
    }

    #[test]
    fn test_scalar_attributes_are_rendered_to_strings() {
        let attrs = parse_attributes(br#"{"service": "nginx", "port": 8080, "debug": true, "note": null}"#)
            .unwrap();
        assert_eq!(attrs.get("service").unwrap(), "nginx");
        assert_eq!(attrs.get("port").unwrap(), "8080");
        assert_eq!(attrs.get("debug").unwrap(), "true");
        assert_eq!(attrs.get("note").unwrap(), "");
    }
}
