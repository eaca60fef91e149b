//! Versioned records over an append-only ledger.
//!
//! The ledger never updates anything. A record is therefore a *chain* of
//! transactions sharing an `application-id` tag: the first one (the root) has
//! no back-reference, and every later version carries `points-to-root`. The
//! ledger's mutable-resolution endpoint, given the root id, returns the newest
//! version, which is what makes the root-based [`Address`] stable.
//!
//! - [`Publisher`]: writes the root of a new chain
//! - [`RootResolver`]: finds the root of an existing chain
//! - [`Updater`]: appends a version pointing at the root
//! - [`Retriever`]: lists every root and fetches the latest version of each
//! - [`RecordStore`]: owns a ledger client and configuration, entry point for
//!   callers

pub mod config;
pub mod error;
pub mod payload;
pub mod publisher;
pub mod resolver;
pub mod retriever;
pub mod store;
pub mod updater;

pub use config::RecordsConfig;
pub use error::{RecordError, RecordResult};
pub use publisher::{Published, Publisher};
pub use resolver::RootResolver;
pub use retriever::{Retriever, Version};
pub use store::RecordStore;
pub use updater::Updater;

pub use mcps_types::{Address, RecordId, TransactionId};
