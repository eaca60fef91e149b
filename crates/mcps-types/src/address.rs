use std::fmt;

use serde::{Deserialize, Serialize};

use crate::transaction::TransactionId;

/// Externally published locator for "the current value of a record".
///
/// Built from a gateway base URL and a *root* transaction id. The gateway's
/// mutable-resolution endpoint follows the chain, so the address never changes
/// across updates.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// `<gateway>/mutable/<root>`.
    pub fn mutable(gateway: &str, root: &TransactionId) -> Self {
        Self(format!("{}/mutable/{}", gateway.trim_end_matches('/'), root))
    }

    /// `<gateway>/<id>`, the raw, non-resolving locator of one version.
    pub fn raw(gateway: &str, id: &TransactionId) -> Self {
        Self(format!("{}/{}", gateway.trim_end_matches('/'), id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutable_address_format() {
        let root = TransactionId::new("root1").unwrap();
        let a = Address::mutable("https://gateway.example/", &root);
        assert_eq!(a.as_str(), "https://gateway.example/mutable/root1");
    }

    #[test]
    fn raw_address_format() {
        let id = TransactionId::new("v2").unwrap();
        assert_eq!(Address::raw("mem://ledger", &id).as_str(), "mem://ledger/v2");
    }

    #[test]
    fn serializes_as_plain_string() {
        let a = Address::mutable("g", &TransactionId::new("r").unwrap());
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"g/mutable/r\"");
    }
}
