use std::sync::Arc;

use serde_json::Value;

use mcps_ledger::LedgerClient;
use mcps_types::{RecordId, TransactionId};

use crate::config::RecordsConfig;
use crate::error::RecordResult;
use crate::publisher::{Published, Publisher};
use crate::resolver::RootResolver;
use crate::retriever::{Retriever, Version};
use crate::updater::Updater;

/// High-level record API over a shared ledger client.
///
/// Cheap to clone; every clone talks to the same ledger. Holds no mutable
/// state of its own, so concurrent calls never coordinate locally.
#[derive(Clone)]
pub struct RecordStore {
    ledger: Arc<dyn LedgerClient>,
    config: Arc<RecordsConfig>,
}

impl RecordStore {
    pub fn new(ledger: Arc<dyn LedgerClient>, config: RecordsConfig) -> Self {
        Self {
            ledger,
            config: Arc::new(config),
        }
    }

    pub fn ledger(&self) -> &dyn LedgerClient {
        self.ledger.as_ref()
    }

    pub fn config(&self) -> &RecordsConfig {
        &self.config
    }

    // ---- Write operations ----

    pub async fn create(&self, payload: Value) -> RecordResult<Published> {
        Publisher::new(self.ledger(), &self.config).create(payload).await
    }

    pub async fn update(&self, payload: Value) -> RecordResult<Published> {
        Updater::new(self.ledger(), &self.config).update(payload).await
    }

    // ---- Read operations ----

    pub async fn resolve_root(&self, record: &RecordId) -> RecordResult<TransactionId> {
        RootResolver::new(self.ledger(), &self.config)
            .resolve_root(record)
            .await
    }

    pub async fn list_root_ids(&self) -> RecordResult<Vec<TransactionId>> {
        self.retriever().list_root_ids().await
    }

    pub async fn list(&self) -> RecordResult<Vec<Value>> {
        self.retriever().retrieve_all().await
    }

    pub async fn get(&self, record: &RecordId) -> RecordResult<Value> {
        self.retriever().get(record).await
    }

    pub async fn history(&self, record: &RecordId) -> RecordResult<Vec<Version>> {
        self.retriever().history(record).await
    }

    fn retriever(&self) -> Retriever<'_> {
        Retriever::new(self.ledger(), &self.config)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("owner", &self.ledger.owner())
            .field("config", &self.config)
            .finish()
    }
}
