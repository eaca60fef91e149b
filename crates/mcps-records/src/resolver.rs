use mcps_ledger::{LedgerClient, TagQuery, TransactionRecord};
use mcps_types::{names, RecordId, TransactionId};

use crate::config::RecordsConfig;
use crate::error::{RecordError, RecordResult};

/// Finds the root transaction of a record's version chain.
pub struct RootResolver<'a> {
    ledger: &'a dyn LedgerClient,
    config: &'a RecordsConfig,
}

impl<'a> RootResolver<'a> {
    pub fn new(ledger: &'a dyn LedgerClient, config: &'a RecordsConfig) -> Self {
        Self { ledger, config }
    }

    /// Every transaction of the chain, as reported by the index.
    pub async fn chain(&self, record: &RecordId) -> RecordResult<Vec<TransactionRecord>> {
        let query = TagQuery::new()
            .owner(self.ledger.owner())
            .tag(names::APPLICATION_ID, record.as_str())
            .tag(names::CLASS, self.config.record_class.as_str());
        Ok(self.ledger.query(&query).await?)
    }

    /// Query the index and pick the root. Not cached: every call costs one
    /// index round trip, proportional to chain length.
    pub async fn resolve_root(&self, record: &RecordId) -> RecordResult<TransactionId> {
        let chain = self.chain(record).await?;
        select_root(record, &chain)
    }
}

/// Pick the root out of a chain.
///
/// A well-formed chain has exactly one transaction without `points-to-root`.
/// If several exist, the earliest by ledger timestamp wins, ties broken by the
/// smaller id, so the answer does not depend on index response order.
pub fn select_root(record: &RecordId, chain: &[TransactionRecord]) -> RecordResult<TransactionId> {
    let mut roots = chain.iter().filter(|tx| tx.is_root());
    let Some(first) = roots.next() else {
        return Err(RecordError::NotFound(record.to_string()));
    };

    let mut candidates = 1usize;
    let mut chosen = first;
    for tx in roots {
        candidates += 1;
        if (tx.timestamp, &tx.id) < (chosen.timestamp, &chosen.id) {
            chosen = tx;
        }
    }
    if candidates > 1 {
        tracing::warn!(
            record = %record,
            candidates,
            chosen = %chosen.id,
            "multiple root transactions for one record"
        );
    }
    Ok(chosen.id.clone())
}
