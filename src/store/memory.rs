//! In-memory authorization store
//!
//! Backs tests and single-process deployments that do not need the
//! workflow state to survive a restart.

use crate::errors::Result;
use crate::store::{AuthStore, PendingApproval, WorkflowState};
use chrono::{Duration, Utc};
use std::net::IpAddr;
use std::sync::RwLock;
use tracing::debug;

/// In-memory authorization store
pub struct MemoryAuthStore {
    state: RwLock<WorkflowState>,
    /// How long a grant stays valid; `None` means grants never expire
    ttl: Option<Duration>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(WorkflowState::default()),
            ttl: None,
        }
    }

    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            state: RwLock::new(WorkflowState::default()),
            ttl,
        }
    }
}

impl Default for MemoryAuthStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthStore for MemoryAuthStore {
    fn enqueue(&self, pending: PendingApproval) -> Result<()> {
        let mut state = self.state.write().unwrap();
        debug!("queueing approval request for '{}' from {}", pending.cn, pending.ip);
        state.enqueue(pending);
        Ok(())
    }

    fn list_pending(&self) -> Result<Vec<PendingApproval>> {
        let state = self.state.read().unwrap();
        Ok(state.pending.clone())
    }

    fn grant(&self, cn: &str, ip: IpAddr) -> Result<()> {
        let mut state = self.state.write().unwrap();
        debug!("granting authorization for '{}' from {}", cn, ip);
        state.grant(cn, ip, Utc::now());
        Ok(())
    }

    fn is_authorized(&self, cn: &str, ip: IpAddr) -> Result<bool> {
        let state = self.state.read().unwrap();
        Ok(state.is_authorized(cn, ip, Utc::now(), self.ttl))
    }
}
