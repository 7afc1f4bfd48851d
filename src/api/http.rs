//! HTTP handlers
//!
//! Routes:
//! - `GET  /api/keys` — identity names with key material
//! - `POST /api/keys/:cn` — request a key; 200 with bytes, 201 receipt,
//!   or a 4xx/5xx mapped from the core error
//! - `GET  /approvals` — pending approvals for the review surface
//! - `POST /approvals` — administrator grant action, form-encoded (cn, ip)
//!
//! The peer address comes from `ConnectInfo`, never from the payload.

use crate::errors::KeyGateError;
use crate::gateway::{GateOutcome, KeyGateway};
use crate::keystore::KeyInventory;
use crate::store::AuthStore;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub gateway: KeyGateway,
    pub store: Arc<dyn AuthStore>,
    pub inventory: Arc<dyn KeyInventory>,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/keys", get(list_keys))
        .route("/api/keys/:cn", post(request_key))
        .route("/approvals", get(list_approvals).post(grant_approval))
        .with_state(state)
}

async fn list_keys(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let names = state.inventory.list_identities()?;
    Ok(Json(names).into_response())
}

async fn request_key(
    State(state): State<Arc<AppState>>,
    Path(cn): Path<String>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Bytes,
) -> Result<Response, ApiError> {
    match state.gateway.handle_request(&cn, peer.ip(), &body)? {
        GateOutcome::Key(bytes) => Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response()),
        GateOutcome::Pending(receipt) => {
            Ok((StatusCode::CREATED, Json(receipt)).into_response())
        }
    }
}

async fn list_approvals(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let pending = state.store.list_pending()?;
    Ok(Json(pending).into_response())
}

#[derive(Debug, Deserialize)]
struct GrantForm {
    cn: String,
    ip: String,
}

async fn grant_approval(
    State(state): State<Arc<AppState>>,
    Form(form): Form<GrantForm>,
) -> Result<Response, ApiError> {
    let ip: IpAddr = form.ip.parse().map_err(|_| {
        ApiError(KeyGateError::BadRequest(format!(
            "'{}' is not an IP address",
            form.ip
        )))
    })?;

    state.store.grant(&form.cn, ip)?;
    info!("approved '{}' from {}", form.cn, ip);
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Wrapper giving core errors an HTTP rendering.
pub struct ApiError(KeyGateError);

impl From<KeyGateError> for ApiError {
    fn from(err: KeyGateError) -> Self {
        ApiError(err)
    }
}

/// Map a core error to its HTTP status. Denial and bad input are ordinary
/// responses; only infrastructure failure looks like a 5xx.
fn status_for(err: &KeyGateError) -> StatusCode {
    match err {
        KeyGateError::BadRequest(_) => StatusCode::BAD_REQUEST,
        KeyGateError::Forbidden(_) => StatusCode::FORBIDDEN,
        KeyGateError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        KeyGateError::StorageError(_) => StatusCode::SERVICE_UNAVAILABLE,
        KeyGateError::ConfigError(_)
        | KeyGateError::InvalidCidr { .. }
        | KeyGateError::InvalidPattern { .. }
        | KeyGateError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!("request failed: {}", self.0);
        }
        (status, self.0.to_string()).into_response()
    }
}
