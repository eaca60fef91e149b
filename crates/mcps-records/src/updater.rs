use serde_json::Value;

use mcps_ledger::LedgerClient;
use mcps_types::names;

use crate::config::RecordsConfig;
use crate::error::RecordResult;
use crate::payload;
use crate::publisher::Published;
use crate::resolver::RootResolver;

/// Appends a new version to an existing record.
pub struct Updater<'a> {
    ledger: &'a dyn LedgerClient,
    config: &'a RecordsConfig,
}

impl<'a> Updater<'a> {
    pub fn new(ledger: &'a dyn LedgerClient, config: &'a RecordsConfig) -> Self {
        Self { ledger, config }
    }

    /// Upload `payload` as the newest version of the record named by its
    /// `recordId` field.
    ///
    /// The root is resolved first; if none exists the call fails with
    /// [`RecordError::NotFound`](crate::RecordError::NotFound) and nothing is
    /// written. The returned address is built from the root, not from the new
    /// transaction.
    pub async fn update(&self, payload: Value) -> RecordResult<Published> {
        let object = payload::into_object(payload)?;
        let record_id = payload::record_id_of(&object)?;

        let root = RootResolver::new(self.ledger, self.config)
            .resolve_root(&record_id)
            .await?;
        tracing::debug!(record = %record_id, root = %root, "resolved root for update");

        let mut tags = payload::chain_tags(self.config, &record_id, &object);
        tags.push(names::POINTS_TO_ROOT, root.as_str());
        let transaction = self.ledger.upload(payload::to_bytes(object)?, tags).await?;
        tracing::info!(record = %record_id, tx = %transaction, root = %root, "record updated");

        Ok(Published {
            address: self.ledger.stable_address(&root),
            record_id,
            transaction,
            root,
        })
    }
}
