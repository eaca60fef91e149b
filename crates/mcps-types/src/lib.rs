//! Foundation types for MCP Storage.
//!
//! Every other `mcps-*` crate depends on this one. It carries no I/O and no
//! async code, only the identifiers and tag vocabulary shared between the
//! ledger client, the record operations, and the HTTP surface.
//!
//! # Key Types
//!
//! - [`TransactionId`]: Opaque, content-derived id of one ledger transaction
//! - [`RecordId`]: Logical identity of a versioned record (UUID v7)
//! - [`Tag`] / [`Tags`]: Name/value annotations attached to transactions
//! - [`Address`]: Stable locator resolving to the latest version of a record

pub mod address;
pub mod error;
pub mod record;
pub mod tag;
pub mod transaction;

pub use address::Address;
pub use error::TypeError;
pub use record::RecordId;
pub use tag::{names, Tag, Tags, CONTENT_TYPE_JSON, DEFAULT_RECORD_CLASS};
pub use transaction::TransactionId;
