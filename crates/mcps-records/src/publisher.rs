use serde::Serialize;
use serde_json::Value;

use mcps_ledger::LedgerClient;
use mcps_types::{Address, RecordId, TransactionId};

use crate::config::RecordsConfig;
use crate::error::RecordResult;
use crate::payload::{self, RECORD_ID_FIELD};

/// Outcome of a successful create or update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Published {
    pub record_id: RecordId,
    /// The transaction written by this call.
    pub transaction: TransactionId,
    /// Root of the record's chain. Equals `transaction` on create.
    pub root: TransactionId,
    /// Stable locator built from `root`.
    pub address: Address,
}

/// Writes the root transaction of a brand-new record.
pub struct Publisher<'a> {
    ledger: &'a dyn LedgerClient,
    config: &'a RecordsConfig,
}

impl<'a> Publisher<'a> {
    pub fn new(ledger: &'a dyn LedgerClient, config: &'a RecordsConfig) -> Self {
        Self { ledger, config }
    }

    /// Assign a fresh record id, tag, and upload.
    ///
    /// Any `recordId` already present in `payload` is overwritten. The upload
    /// is attempted once; failures are returned to the caller.
    pub async fn create(&self, payload: Value) -> RecordResult<Published> {
        let mut object = payload::into_object(payload)?;
        let record_id = RecordId::generate();
        object.insert(
            RECORD_ID_FIELD.into(),
            Value::String(record_id.as_str().to_string()),
        );

        let tags = payload::chain_tags(self.config, &record_id, &object);
        let transaction = self.ledger.upload(payload::to_bytes(object)?, tags).await?;
        tracing::info!(record = %record_id, tx = %transaction, "record created");

        Ok(Published {
            address: self.ledger.stable_address(&transaction),
            root: transaction.clone(),
            transaction,
            record_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecordError;
    use mcps_ledger::{InMemoryLedger, LedgerError};
    use mcps_types::names;
    use serde_json::json;

    #[tokio::test]
    async fn create_assigns_id_and_tags() {
        let ledger = InMemoryLedger::default();
        let config = RecordsConfig::default();
        let published = Publisher::new(&ledger, &config)
            .create(json!({"name": "X", "author": "ana"}))
            .await
            .unwrap();

        assert_eq!(published.root, published.transaction);
        assert_eq!(published.address, ledger.stable_address(&published.transaction));

        let tags = ledger.tags_of(&published.transaction).unwrap();
        assert_eq!(tags.get(names::APPLICATION_ID), Some(published.record_id.as_str()));
        assert_eq!(tags.get(names::AUTHOR), Some("ana"));
        assert!(tags.points_to_root().is_none());

        let stored: Value =
            serde_json::from_slice(&ledger.fetch_raw(&published.transaction).await.unwrap())
                .unwrap();
        assert_eq!(stored["recordId"], published.record_id.as_str());
        assert_eq!(stored["name"], "X");
    }

    #[tokio::test]
    async fn caller_supplied_id_is_overwritten() {
        let ledger = InMemoryLedger::default();
        let config = RecordsConfig::default();
        let published = Publisher::new(&ledger, &config)
            .create(json!({"recordId": "chosen-by-caller"}))
            .await
            .unwrap();
        assert_ne!(published.record_id.as_str(), "chosen-by-caller");
    }

    #[tokio::test]
    async fn upload_failure_is_returned() {
        let ledger = InMemoryLedger::default();
        ledger.fail_uploads("bundler unavailable");
        let config = RecordsConfig::default();
        let err = Publisher::new(&ledger, &config)
            .create(json!({"name": "X"}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecordError::Ledger(LedgerError::Network(ref m)) if m == "bundler unavailable"
        ));
    }

    #[tokio::test]
    async fn non_object_payload_is_rejected() {
        let ledger = InMemoryLedger::default();
        let config = RecordsConfig::default();
        let err = Publisher::new(&ledger, &config)
            .create(json!("just a string"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::InvalidPayload(_)));
        assert_eq!(ledger.transaction_count(), 0);
    }
}
