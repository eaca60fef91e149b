use serde::{Deserialize, Serialize};

use mcps_types::{Tags, TransactionId};

/// Match transactions carrying tag `name` with any of `values`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagFilter {
    pub name: String,
    pub values: Vec<String>,
}

/// Index query: every filter must match (AND); within one filter any value
/// may match (OR). An empty owner list matches every owner.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagQuery {
    pub owners: Vec<String>,
    pub tags: Vec<TagFilter>,
}

impl TagQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owners.push(owner.into());
        self
    }

    pub fn tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(TagFilter {
            name: name.into(),
            values: vec![value.into()],
        });
        self
    }

    pub fn matches(&self, owner: &str, tags: &Tags) -> bool {
        let owner_ok = self.owners.is_empty() || self.owners.iter().any(|o| o == owner);
        owner_ok
            && self.tags.iter().all(|filter| {
                tags.iter()
                    .any(|t| t.name == filter.name && filter.values.contains(&t.value))
            })
    }
}

/// One index hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub tags: Tags,
    /// Ledger-assigned timestamp, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl TransactionRecord {
    pub fn is_root(&self) -> bool {
        self.tags.points_to_root().is_none()
    }
}
