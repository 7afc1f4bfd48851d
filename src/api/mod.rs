//! API layer for keygate
//!
//! Thin HTTP wrappers over the gateway and approval store. All decision
//! logic lives below this layer; handlers only translate between HTTP and
//! core outcomes.

pub mod http;

pub use http::{router, AppState};
