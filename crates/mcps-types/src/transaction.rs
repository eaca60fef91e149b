use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifier of one immutable ledger transaction.
///
/// The ledger derives ids from content, so this type never interprets them:
/// it only guarantees the id is non-empty and safe to splice into a URL path
/// segment or a tag value.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionId(String);

impl TransactionId {
    /// Validate and wrap a ledger-issued id.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::Empty);
        }
        if let Some(ch) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(TypeError::InvalidCharacter { value: id, ch });
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 8 characters) for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.short())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TransactionId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TransactionId> for String {
    fn from(id: TransactionId) -> Self {
        id.0
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_base64url_ids() {
        let id = TransactionId::new("Xk3_9-aBcD").unwrap();
        assert_eq!(id.as_str(), "Xk3_9-aBcD");
        assert_eq!(id.to_string(), "Xk3_9-aBcD");
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(TransactionId::new(""), Err(TypeError::Empty));
    }

    #[test]
    fn rejects_path_separators() {
        let err = TransactionId::new("abc/def").unwrap_err();
        assert!(matches!(err, TypeError::InvalidCharacter { ch: '/', .. }));
    }

    #[test]
    fn short_form_is_bounded() {
        assert_eq!(TransactionId::new("abcdefghijkl").unwrap().short(), "abcdefgh");
        assert_eq!(TransactionId::new("abc").unwrap().short(), "abc");
    }

    #[test]
    fn serde_is_transparent_and_validated() {
        let id = TransactionId::new("tx1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tx1\"");
        assert!(serde_json::from_str::<TransactionId>("\"\"").is_err());
    }
}
