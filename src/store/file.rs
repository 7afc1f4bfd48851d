//! File-backed authorization store
//!
//! Persists the workflow state as a JSON document after every mutation, so
//! pending approvals and grants survive a restart. Multiple gateway
//! processes sharing one state file should front it with their own
//! coordination; within a process every operation is one critical section.

use crate::errors::{KeyGateError, Result};
use crate::store::{AuthStore, PendingApproval, WorkflowState};
use chrono::{Duration, Utc};
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

/// Authorization store persisted to a JSON file
pub struct FileAuthStore {
    path: PathBuf,
    state: RwLock<WorkflowState>,
    ttl: Option<Duration>,
}

impl FileAuthStore {
    /// Open a store at `path`, creating parent directories as needed. A
    /// missing file starts empty; an unreadable or corrupt file is a
    /// storage error, not an empty store.
    pub fn open(path: impl AsRef<Path>, ttl: Option<Duration>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let state = if path.exists() {
            let json = fs::read_to_string(&path)?;
            serde_json::from_str(&json).map_err(|e| {
                KeyGateError::StorageError(format!("corrupt state file {:?}: {}", path, e))
            })?
        } else {
            WorkflowState::default()
        };

        info!(
            "Opened authorization store at {:?} ({} pending, {} grants)",
            path,
            state.pending.len(),
            state.grants.len()
        );

        Ok(Self {
            path,
            state: RwLock::new(state),
            ttl,
        })
    }

    /// Write the state while the caller still holds the write lock.
    fn persist(&self, state: &WorkflowState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl AuthStore for FileAuthStore {
    fn enqueue(&self, pending: PendingApproval) -> Result<()> {
        let mut state = self.state.write().unwrap();
        debug!("queueing approval request for '{}' from {}", pending.cn, pending.ip);
        state.enqueue(pending);
        self.persist(&state)
    }

    fn list_pending(&self) -> Result<Vec<PendingApproval>> {
        let state = self.state.read().unwrap();
        Ok(state.pending.clone())
    }

    fn grant(&self, cn: &str, ip: IpAddr) -> Result<()> {
        let mut state = self.state.write().unwrap();
        debug!("granting authorization for '{}' from {}", cn, ip);
        state.grant(cn, ip, Utc::now());
        self.persist(&state)
    }

    fn is_authorized(&self, cn: &str, ip: IpAddr) -> Result<bool> {
        let state = self.state.read().unwrap();
        Ok(state.is_authorized(cn, ip, Utc::now(), self.ttl))
    }
}
