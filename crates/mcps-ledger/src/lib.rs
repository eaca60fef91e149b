//! Ledger client for MCP Storage.
//!
//! The ledger is an external, append-only, content-addressed store. It offers
//! four capabilities and this crate wraps each behind the [`LedgerClient`]
//! trait:
//!
//! - tag-indexed queries returning transaction ids and tags
//! - raw content fetch by transaction id
//! - mutable resolution: the latest transaction pointing at a root id
//! - signed upload of a new immutable transaction (the only write path)
//!
//! Two implementations are provided:
//!
//! - [`HttpLedger`]: GraphQL index + HTTP gateway + uploader, via `reqwest`
//! - [`InMemoryLedger`]: same semantics in memory, for tests and local runs

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod query;
pub mod traits;
pub mod wire;

pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use http::HttpLedger;
pub use memory::InMemoryLedger;
pub use query::{TagFilter, TagQuery, TransactionRecord};
pub use traits::LedgerClient;
