//! HTTP server for MCP Storage.
//!
//! Exposes create, modify, and list over HTTP, every route except liveness
//! guarded by an encrypted `x-api-key` header. Domain failures (unknown
//! record, ledger unavailable) are reported in the body with `state: false`
//! and HTTP 200; only authentication failures and unexpected faults change the
//! status code.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{ApiKeyGate, GateDecision, Rejection, API_KEY_HEADER};
pub use config::{AppConfig, AuthConfig, LedgerBackend, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use handler::ApiResponse;
pub use server::McpsServer;
pub use state::AppState;
