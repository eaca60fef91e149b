//! Wire formats spoken with the ledger's index and uploader.

use serde::{Deserialize, Serialize};

use mcps_types::Tag;

use crate::query::TagFilter;

pub const TRANSACTIONS_QUERY: &str = r#"
query($owners: [String!], $tags: [TagFilter!], $first: Int, $after: String) {
    transactions(owners: $owners, tags: $tags, first: $first, after: $after) {
        pageInfo {
            hasNextPage
        }
        edges {
            cursor
            node {
                id
                timestamp
                tags {
                    name
                    value
                }
            }
        }
    }
}
"#;

#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: QueryVariables<'a>,
}

#[derive(Debug, Serialize)]
pub struct QueryVariables<'a> {
    #[serde(skip_serializing_if = "no_owners")]
    pub owners: &'a [String],
    pub tags: &'a [TagFilter],
    pub first: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<&'a str>,
}

fn no_owners(owners: &&[String]) -> bool {
    owners.is_empty()
}

#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    pub data: Option<TransactionsData>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsData {
    pub transactions: TransactionConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionConnection {
    #[serde(default)]
    pub page_info: PageInfo,
    pub edges: Vec<TransactionEdge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
}

#[derive(Debug, Deserialize)]
pub struct TransactionEdge {
    pub cursor: Option<String>,
    pub node: TransactionNode,
}

#[derive(Debug, Deserialize)]
pub struct TransactionNode {
    pub id: String,
    #[serde(default)]
    pub timestamp: u64,
    pub tags: Vec<Tag>,
}

/// Body posted to `<uploader>/tx`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadRequest {
    pub owner: String,
    pub tags: Vec<Tag>,
    /// Standard base64 of the payload bytes.
    pub data: String,
    /// Hex ed25519 signature over the upload digest.
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<u64>,
}
