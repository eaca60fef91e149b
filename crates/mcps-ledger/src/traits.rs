use async_trait::async_trait;
use bytes::Bytes;

use mcps_types::{Address, Tags, TransactionId};

use crate::error::LedgerResult;
use crate::query::{TagQuery, TransactionRecord};

/// Capability boundary to the external ledger.
///
/// Every method is a network round trip in production. Implementations must
/// surface failures as [`LedgerError`](crate::LedgerError) and never retry on
/// their own; retry policy belongs to the caller.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Owner (wallet public key) that uploads are attributed to.
    fn owner(&self) -> &str;

    /// Locator that the ledger resolves to the latest version of `root`'s chain.
    fn stable_address(&self, root: &TransactionId) -> Address;

    /// Locator of exactly one transaction.
    fn raw_address(&self, id: &TransactionId) -> Address;

    /// Index query. Result order is unspecified.
    async fn query(&self, query: &TagQuery) -> LedgerResult<Vec<TransactionRecord>>;

    /// Bytes of exactly one transaction.
    async fn fetch_raw(&self, id: &TransactionId) -> LedgerResult<Bytes>;

    /// Bytes of the latest transaction pointing at `root`, or of `root` itself
    /// when nothing points at it yet.
    async fn fetch_mutable(&self, root: &TransactionId) -> LedgerResult<Bytes>;

    /// Write a new immutable transaction.
    async fn upload(&self, data: Vec<u8>, tags: Tags) -> LedgerResult<TransactionId>;
}

