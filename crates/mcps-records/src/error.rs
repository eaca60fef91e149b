use thiserror::Error;

use mcps_ledger::LedgerError;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid record payload: {0}")]
    InvalidPayload(String),

    /// No root transaction exists for the record id.
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type RecordResult<T> = Result<T, RecordError>;
