use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("identifier must not be empty")]
    Empty,

    #[error("invalid character {ch:?} in identifier {value:?}")]
    InvalidCharacter { value: String, ch: char },

    #[error("invalid record id: {0}")]
    InvalidRecordId(String),
}
