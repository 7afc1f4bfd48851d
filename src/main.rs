//! keygate - Policy-gated key distribution with human approval
//!
//! A service that gates read access to key material by caller identity:
//! - Every request is checked against a per-identity policy (CIDR ranges
//!   plus attribute checks)
//! - Permitted callers without an approval on file are queued for human
//!   review instead of being rejected
//! - After an administrator approves the (identity, address) pair, the
//!   identical retried request receives the key bytes
//!
//! # Usage
//!
//! ```bash
//! # Start the server
//! keygate
//!
//! # Or with a config file
//! keygate --config /etc/keygate/config.toml
//! ```

mod api;
mod config;
mod errors;
mod gateway;
mod keystore;
mod policy;
mod store;

use crate::api::AppState;
use crate::config::Config;
use crate::errors::{KeyGateError, Result};
use crate::gateway::KeyGateway;
use crate::keystore::{DirKeyStore, KeyInventory};
use crate::policy::PolicyEngine;
use crate::store::{AuthStore, FileAuthStore, MemoryAuthStore};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting keygate v{}", VERSION);

    // Load configuration
    let config_path = env::args().nth(2); // --config path
    let config = Config::load(config_path.as_deref())?;
    config.validate()?;

    info!("Configuration loaded");

    // Compile identity policies; a malformed document is fatal
    let policy_engine = Arc::new(PolicyEngine::load(&config.policy.rules_path)?);

    // Open the key inventory (read-only from our side)
    let inventory: Arc<dyn KeyInventory> =
        Arc::new(DirKeyStore::new(&config.keystore.key_dir)?);

    // Open the authorization store
    let ttl = match config.approval.grant_ttl_seconds {
        0 => None,
        secs => Some(chrono::Duration::seconds(secs as i64)),
    };
    let store: Arc<dyn AuthStore> = match &config.approval.state_path {
        Some(path) => Arc::new(FileAuthStore::open(path, ttl)?),
        None => {
            warn!("no approval state path configured; workflow state will not survive restart");
            Arc::new(MemoryAuthStore::with_ttl(ttl))
        }
    };

    // Wire the gateway and the HTTP surface
    let gateway = KeyGateway::new(policy_engine, store.clone(), inventory.clone());
    let state = Arc::new(AppState {
        gateway,
        store,
        inventory,
    });
    let app = api::router(state);

    let addr = config.server_addr();
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KeyGateError::ConfigError(format!("cannot bind {}: {}", addr, e)))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| KeyGateError::InternalError(e.to_string()))?;

    info!("Server shut down gracefully");
    Ok(())
}

/// Initialize logging
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}
