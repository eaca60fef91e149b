use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use mcps_crypto::ContentHasher;
use mcps_types::{Address, Tags, TransactionId};

use crate::error::{LedgerError, LedgerResult};
use crate::query::{TagQuery, TransactionRecord};
use crate::traits::LedgerClient;

const GATEWAY: &str = "mem://ledger";

/// In-memory ledger for tests, local demos, and embedding.
///
/// Mirrors the external ledger's observable behaviour: ids are content-derived,
/// transactions are immutable, the index matches tags exactly, and mutable
/// resolution returns the most recently written transaction that points at a
/// root (same owner only). Query results come back newest first, so callers
/// cannot rely on insertion order.
pub struct InMemoryLedger {
    owner: String,
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    transactions: Vec<StoredTransaction>,
    id_index: HashMap<TransactionId, usize>,
    failing_fetches: HashSet<TransactionId>,
    upload_failure: Option<String>,
    query_failure: Option<String>,
    fetch_count: usize,
}

#[derive(Clone, Debug)]
struct StoredTransaction {
    id: TransactionId,
    owner: String,
    tags: Tags,
    data: Bytes,
    timestamp: u64,
}

impl InMemoryLedger {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            inner: RwLock::new(LedgerState::default()),
        }
    }

    /// Write a transaction attributed to an arbitrary owner.
    pub fn upload_as(
        &self,
        owner: &str,
        data: Vec<u8>,
        tags: Tags,
    ) -> LedgerResult<TransactionId> {
        let mut state = self.write()?;
        let timestamp = next_timestamp(state.transactions.last());
        Self::append(&mut state, owner, data, tags, timestamp)
    }

    /// Write a transaction with an explicit ledger timestamp.
    pub fn upload_at(
        &self,
        data: Vec<u8>,
        tags: Tags,
        timestamp: u64,
    ) -> LedgerResult<TransactionId> {
        let mut state = self.write()?;
        Self::append(&mut state, &self.owner, data, tags, timestamp)
    }

    /// Make every subsequent fetch of `id` (raw or mutable) fail.
    pub fn fail_fetches_for(&self, id: &TransactionId) {
        if let Ok(mut state) = self.inner.write() {
            state.failing_fetches.insert(id.clone());
        }
    }

    /// Make every subsequent upload fail with `reason`.
    pub fn fail_uploads(&self, reason: impl Into<String>) {
        if let Ok(mut state) = self.inner.write() {
            state.upload_failure = Some(reason.into());
        }
    }

    /// Make every subsequent index query fail with `reason`.
    pub fn fail_queries(&self, reason: impl Into<String>) {
        if let Ok(mut state) = self.inner.write() {
            state.query_failure = Some(reason.into());
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.inner.read().map(|s| s.transactions.len()).unwrap_or(0)
    }

    /// Number of fetch calls served (successful or not).
    pub fn fetch_count(&self) -> usize {
        self.inner.read().map(|s| s.fetch_count).unwrap_or(0)
    }

    /// Tags of a stored transaction.
    pub fn tags_of(&self, id: &TransactionId) -> Option<Tags> {
        let state = self.inner.read().ok()?;
        let index = *state.id_index.get(id)?;
        Some(state.transactions[index].tags.clone())
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Network("ledger read lock poisoned".into()))
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, LedgerState>> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Network("ledger write lock poisoned".into()))
    }

    fn append(
        state: &mut LedgerState,
        owner: &str,
        data: Vec<u8>,
        tags: Tags,
        timestamp: u64,
    ) -> LedgerResult<TransactionId> {
        let seq = state.transactions.len() as u64;
        let mut material = ContentHasher::TRANSACTION
            .hash_upload(owner, &tags, &data)
            .to_vec();
        material.extend_from_slice(&seq.to_le_bytes());
        let id = TransactionId::new(hex::encode(ContentHasher::TRANSACTION.hash(&material)))
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;

        state.id_index.insert(id.clone(), state.transactions.len());
        state.transactions.push(StoredTransaction {
            id: id.clone(),
            owner: owner.to_string(),
            tags,
            data: Bytes::from(data),
            timestamp,
        });
        Ok(id)
    }

    fn lookup<'a>(
        state: &'a LedgerState,
        id: &TransactionId,
    ) -> LedgerResult<&'a StoredTransaction> {
        state
            .id_index
            .get(id)
            .and_then(|&index| state.transactions.get(index))
            .ok_or_else(|| LedgerError::NotFound(id.to_string()))
    }

    fn begin_fetch(&self, id: &TransactionId) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        {
            let mut state = self.write()?;
            state.fetch_count += 1;
            if state.failing_fetches.contains(id) {
                return Err(LedgerError::Network(format!("injected fetch failure for {id}")));
            }
        }
        self.read()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new("memory-owner")
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn stable_address(&self, root: &TransactionId) -> Address {
        Address::mutable(GATEWAY, root)
    }

    fn raw_address(&self, id: &TransactionId) -> Address {
        Address::raw(GATEWAY, id)
    }

    async fn query(&self, query: &TagQuery) -> LedgerResult<Vec<TransactionRecord>> {
        let state = self.read()?;
        if let Some(reason) = &state.query_failure {
            return Err(LedgerError::Network(reason.clone()));
        }
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|tx| query.matches(&tx.owner, &tx.tags))
            .map(|tx| TransactionRecord {
                id: tx.id.clone(),
                tags: tx.tags.clone(),
                timestamp: tx.timestamp,
            })
            .collect())
    }

    async fn fetch_raw(&self, id: &TransactionId) -> LedgerResult<Bytes> {
        let state = self.begin_fetch(id)?;
        let tx = Self::lookup(&state, id)?;
        Ok(tx.data.clone())
    }

    async fn fetch_mutable(&self, root: &TransactionId) -> LedgerResult<Bytes> {
        let state = self.begin_fetch(root)?;
        let root_tx = Self::lookup(&state, root)?;
        let latest = state
            .transactions
            .iter()
            .rev()
            .find(|tx| {
                tx.owner == root_tx.owner && tx.tags.points_to_root() == Some(root.as_str())
            })
            .unwrap_or(root_tx);
        Ok(latest.data.clone())
    }

    async fn upload(&self, data: Vec<u8>, tags: Tags) -> LedgerResult<TransactionId> {
        let mut state = self.write()?;
        if let Some(reason) = &state.upload_failure {
            return Err(LedgerError::Network(reason.clone()));
        }
        let timestamp = next_timestamp(state.transactions.last());
        let id = Self::append(&mut state, &self.owner, data, tags, timestamp)?;
        tracing::trace!(id = %id, "in-memory upload");
        Ok(id)
    }
}

/// Wall-clock milliseconds, forced strictly past the previous write.
fn next_timestamp(last: Option<&StoredTransaction>) -> u64 {
    let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
    match last {
        Some(prev) if now <= prev.timestamp => prev.timestamp + 1,
        _ => now,
    }
}
