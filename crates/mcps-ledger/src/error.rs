/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Transport failure or a non-success status from the ledger.
    #[error("ledger network error: {0}")]
    Network(String),

    /// The ledger has no content for the requested id.
    #[error("not found on ledger: {0}")]
    NotFound(String),

    /// The ledger answered, but the answer could not be decoded.
    #[error("malformed ledger response: {0}")]
    Malformed(String),

    #[error("ledger configuration error: {0}")]
    Config(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
