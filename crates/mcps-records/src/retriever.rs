use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value;

use mcps_ledger::{LedgerClient, TagQuery, TransactionRecord};
use mcps_types::{names, Address, RecordId, TransactionId, CONTENT_TYPE_JSON};

use crate::config::RecordsConfig;
use crate::error::{RecordError, RecordResult};
use crate::resolver::{select_root, RootResolver};

/// One stored version of a record.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Version {
    pub transaction: TransactionId,
    pub timestamp: u64,
    pub is_root: bool,
    /// Raw locator of this exact version.
    pub address: Address,
    pub payload: Value,
}

/// Lists records and fetches their current content.
pub struct Retriever<'a> {
    ledger: &'a dyn LedgerClient,
    config: &'a RecordsConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(ledger: &'a dyn LedgerClient, config: &'a RecordsConfig) -> Self {
        Self { ledger, config }
    }

    /// Root ids of every record of this class. Versions are excluded, so each
    /// record appears once no matter how many times it was updated.
    pub async fn list_root_ids(&self) -> RecordResult<Vec<TransactionId>> {
        let query = TagQuery::new()
            .owner(self.ledger.owner())
            .tag(names::CONTENT_TYPE, CONTENT_TYPE_JSON)
            .tag(names::CLASS, self.config.record_class.as_str());
        let hits = self.ledger.query(&query).await?;

        let mut seen = HashSet::new();
        let roots: Vec<TransactionId> = hits
            .into_iter()
            .filter(|tx| tx.is_root())
            .map(|tx| tx.id)
            .filter(|id| seen.insert(id.clone()))
            .collect();
        tracing::debug!(count = roots.len(), "listed root transactions");
        Ok(roots)
    }

    /// Fetch the latest payload behind each root, at most
    /// `fetch_concurrency` at a time.
    ///
    /// A failed fetch or an undecodable body drops that record from the result
    /// instead of failing the batch. Output order is unspecified.
    pub async fn fetch_all(&self, roots: &[TransactionId]) -> Vec<Value> {
        let limit = self.config.fetch_concurrency.max(1);
        let fetched: Vec<Option<Value>> = stream::iter(roots)
            .map(|root| self.fetch_latest(root))
            .buffer_unordered(limit)
            .collect::<Vec<_>>()
            .boxed()
            .await;

        let payloads: Vec<Value> = fetched.into_iter().flatten().collect();
        if payloads.len() < roots.len() {
            tracing::warn!(
                requested = roots.len(),
                resolved = payloads.len(),
                "some records could not be fetched"
            );
        }
        payloads
    }

    /// List every record and fetch its latest version. Only a failing index
    /// query fails the whole call.
    pub async fn retrieve_all(&self) -> RecordResult<Vec<Value>> {
        let roots = self.list_root_ids().await?;
        Ok(self.fetch_all(&roots).await)
    }

    /// Latest version of one record.
    pub async fn get(&self, record: &RecordId) -> RecordResult<Value> {
        let root = RootResolver::new(self.ledger, self.config)
            .resolve_root(record)
            .await?;
        let bytes = self.ledger.fetch_mutable(&root).await?;
        decode(&bytes)
    }

    /// Every version of one record, oldest first, each fetched by its raw id.
    pub async fn history(&self, record: &RecordId) -> RecordResult<Vec<Version>> {
        let chain = RootResolver::new(self.ledger, self.config)
            .chain(record)
            .await?;
        let root = select_root(record, &chain)?;

        let mut versions: Vec<_> = chain
            .into_iter()
            .filter(|tx| tx.id == root || tx.tags.points_to_root() == Some(root.as_str()))
            .collect();
        versions.sort_by(|a, b| {
            b.is_root()
                .cmp(&a.is_root())
                .then(a.timestamp.cmp(&b.timestamp))
                .then_with(|| a.id.cmp(&b.id))
        });

        let limit = self.config.fetch_concurrency.max(1);
        let fetched: Vec<RecordResult<Version>> = stream::iter(versions)
            .map(|tx| self.fetch_version(tx))
            .buffered(limit)
            .collect::<Vec<_>>()
            .boxed()
            .await;
        fetched.into_iter().collect()
    }

    async fn fetch_version(&self, tx: TransactionRecord) -> RecordResult<Version> {
        let bytes = self.ledger.fetch_raw(&tx.id).await?;
        Ok(Version {
            is_root: tx.is_root(),
            address: self.ledger.raw_address(&tx.id),
            payload: decode(&bytes)?,
            timestamp: tx.timestamp,
            transaction: tx.id,
        })
    }

    async fn fetch_latest(&self, root: &TransactionId) -> Option<Value> {
        match self.ledger.fetch_mutable(root).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(root = %root, error = %e, "record body is not JSON");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(root = %root, error = %e, "record fetch failed");
                None
            }
        }
    }
}

fn decode(bytes: &[u8]) -> RecordResult<Value> {
    serde_json::from_slice(bytes).map_err(|e| RecordError::Serialization(e.to_string()))
}
