//! Authorization store
//!
//! Tracks the approval workflow state: requests waiting for a human
//! decision, and the (cn, ip) grants that decision produces. The store is
//! the sole source of truth for authorization; if its backing storage
//! fails, operations return a storage error rather than pretending the
//! caller is unauthorized.

pub mod file;
pub mod memory;

pub use file::FileAuthStore;
pub use memory::MemoryAuthStore;

use crate::errors::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// A permitted request waiting for human approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    /// Identity that asked for its key
    pub cn: String,
    /// Peer address the request came from
    pub ip: IpAddr,
    /// Submitted attributes, echoed back for the approver's review
    pub payload: HashMap<String, String>,
    /// When the request was first queued
    pub requested_at: DateTime<Utc>,
}

impl PendingApproval {
    pub fn new(cn: &str, ip: IpAddr, payload: HashMap<String, String>) -> Self {
        Self {
            cn: cn.to_string(),
            ip,
            payload,
            requested_at: Utc::now(),
        }
    }
}

/// A grant binding one identity to one source address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authorization {
    pub cn: String,
    pub ip: IpAddr,
    pub granted_at: DateTime<Utc>,
}

/// Durable approval-workflow store.
///
/// `is_authorized` gates every retried request and must be cheap and safe
/// under concurrent mutation. Each (cn, ip) pair is an independent unit;
/// no operation spans identities.
pub trait AuthStore: Send + Sync {
    /// Queue a permitted request for approval. Re-submissions for the same
    /// (cn, ip) pair coalesce into the existing entry.
    fn enqueue(&self, pending: PendingApproval) -> Result<()>;

    /// All unresolved approvals, in first-seen order.
    fn list_pending(&self) -> Result<Vec<PendingApproval>>;

    /// Record an authorization and resolve matching pending entries.
    /// Granting a pair that is not pending is not an error.
    fn grant(&self, cn: &str, ip: IpAddr) -> Result<()>;

    /// Whether this (cn, ip) pair holds an unexpired grant.
    fn is_authorized(&self, cn: &str, ip: IpAddr) -> Result<bool>;
}

/// The workflow state both store implementations share. All methods are
/// called with the owning store's lock held, so a whole operation is one
/// critical section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct WorkflowState {
    #[serde(default)]
    pub pending: Vec<PendingApproval>,

    #[serde(default)]
    pub grants: Vec<Authorization>,
}

impl WorkflowState {
    /// Coalescing append: a repeat submission refreshes the payload and
    /// timestamp but keeps its place in the queue.
    pub fn enqueue(&mut self, pending: PendingApproval) {
        if let Some(existing) = self
            .pending
            .iter_mut()
            .find(|p| p.cn == pending.cn && p.ip == pending.ip)
        {
            existing.payload = pending.payload;
            existing.requested_at = pending.requested_at;
        } else {
            self.pending.push(pending);
        }
    }

    /// Idempotent grant: a repeat grant refreshes the timestamp.
    pub fn grant(&mut self, cn: &str, ip: IpAddr, now: DateTime<Utc>) {
        self.pending.retain(|p| !(p.cn == cn && p.ip == ip));

        if let Some(existing) = self.grants.iter_mut().find(|g| g.cn == cn && g.ip == ip) {
            existing.granted_at = now;
        } else {
            self.grants.push(Authorization {
                cn: cn.to_string(),
                ip,
                granted_at: now,
            });
        }
    }

    pub fn is_authorized(
        &self,
        cn: &str,
        ip: IpAddr,
        now: DateTime<Utc>,
        ttl: Option<Duration>,
    ) -> bool {
        self.grants.iter().any(|g| {
            g.cn == cn
                && g.ip == ip
                && ttl.map_or(true, |ttl| now - g.granted_at <= ttl)
        })
    }
}
