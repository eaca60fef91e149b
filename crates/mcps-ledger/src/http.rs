use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use reqwest::{Client, StatusCode};

use mcps_crypto::{ContentHasher, WalletKey};
use mcps_types::{Address, Tags, TransactionId};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::query::{TagQuery, TransactionRecord};
use crate::traits::LedgerClient;
use crate::wire::{
    GraphQlRequest, GraphQlResponse, QueryVariables, TransactionConnection, TransactionNode,
    UploadRequest, UploadResponse, TRANSACTIONS_QUERY,
};

/// Upper bound on index pages followed by one query.
const MAX_PAGES: usize = 10_000;

/// HTTP client for a GraphQL-indexed ledger with a content gateway.
pub struct HttpLedger {
    config: LedgerConfig,
    wallet: WalletKey,
    owner: String,
    client: Client,
}

impl HttpLedger {
    /// Build a client from configuration. Fails if the wallet key is missing
    /// or malformed.
    pub fn new(config: &LedgerConfig) -> LedgerResult<Self> {
        let seed = config
            .wallet_key
            .as_deref()
            .ok_or_else(|| LedgerError::Config("wallet_key is not set".into()))?;
        let wallet = WalletKey::from_hex(seed)
            .map_err(|e| LedgerError::Config(format!("wallet_key: {e}")))?;
        if config.page_size == 0 {
            return Err(LedgerError::Config("page_size must be positive".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LedgerError::Config(format!("http client: {e}")))?;

        Ok(Self {
            owner: wallet.owner(),
            config: config.clone(),
            wallet,
            client,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn query_page(
        &self,
        query: &TagQuery,
        after: Option<&str>,
    ) -> LedgerResult<TransactionConnection> {
        let request = GraphQlRequest {
            query: TRANSACTIONS_QUERY,
            variables: QueryVariables {
                owners: &query.owners,
                tags: &query.tags,
                first: self.config.page_size,
                after,
            },
        };

        let response = self
            .client
            .post(&self.config.index_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Network(format!("index: {e}")))?;
        let body = success_body(response, "index").await?;

        let parsed: GraphQlResponse = serde_json::from_slice(&body)
            .map_err(|e| LedgerError::Malformed(format!("index response: {e}")))?;
        if !parsed.errors.is_empty() {
            let messages: Vec<String> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(LedgerError::Malformed(format!(
                "index errors: {}",
                messages.join("; ")
            )));
        }
        parsed
            .data
            .map(|d| d.transactions)
            .ok_or_else(|| LedgerError::Malformed("index response has no data".into()))
    }

    async fn get(&self, address: &Address, what: &TransactionId) -> LedgerResult<Bytes> {
        let response = self
            .client
            .get(address.as_str())
            .send()
            .await
            .map_err(|e| LedgerError::Network(format!("gateway {what}: {e}")))?;
        success_body(response, what.as_str()).await
    }
}

#[async_trait]
impl LedgerClient for HttpLedger {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn stable_address(&self, root: &TransactionId) -> Address {
        Address::mutable(&self.config.gateway_url, root)
    }

    fn raw_address(&self, id: &TransactionId) -> Address {
        Address::raw(&self.config.gateway_url, id)
    }

    async fn query(&self, query: &TagQuery) -> LedgerResult<Vec<TransactionRecord>> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;
        let mut seen_cursors = HashSet::new();
        let mut pages = 0usize;

        loop {
            if pages == MAX_PAGES {
                return Err(LedgerError::Malformed(format!(
                    "index pagination exceeded {MAX_PAGES} pages"
                )));
            }
            let page = self.query_page(query, after.as_deref()).await?;
            pages += 1;
            let next_cursor = page.edges.last().and_then(|e| e.cursor.clone());
            for edge in page.edges {
                records.push(record_from_node(edge.node)?);
            }
            match (page.page_info.has_next_page, next_cursor) {
                (true, Some(cursor)) => {
                    if !seen_cursors.insert(cursor.clone()) {
                        return Err(LedgerError::Malformed(format!(
                            "index repeated pagination cursor {cursor}"
                        )));
                    }
                    after = Some(cursor);
                }
                _ => break,
            }
        }

        tracing::debug!(pages, hits = records.len(), "index query complete");
        Ok(records)
    }

    async fn fetch_raw(&self, id: &TransactionId) -> LedgerResult<Bytes> {
        self.get(&self.raw_address(id), id).await
    }

    async fn fetch_mutable(&self, root: &TransactionId) -> LedgerResult<Bytes> {
        self.get(&self.stable_address(root), root).await
    }

    async fn upload(&self, data: Vec<u8>, tags: Tags) -> LedgerResult<TransactionId> {
        let digest = ContentHasher::UPLOAD.hash_upload(&self.owner, &tags, &data);
        let request = UploadRequest {
            owner: self.owner.clone(),
            signature: self.wallet.sign(&digest).to_hex(),
            tags: tags.into_iter().collect(),
            data: STANDARD.encode(&data),
        };

        let url = format!("{}/tx", self.config.uploader_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Network(format!("upload: {e}")))?;
        let body = success_body(response, "upload").await?;

        let receipt: UploadResponse = serde_json::from_slice(&body)
            .map_err(|e| LedgerError::Malformed(format!("upload response: {e}")))?;
        let id = TransactionId::new(receipt.id)
            .map_err(|e| LedgerError::Malformed(format!("upload response id: {e}")))?;
        tracing::debug!(id = %id, bytes = data.len(), "upload accepted");
        Ok(id)
    }
}

async fn success_body(response: reqwest::Response, what: &str) -> LedgerResult<Bytes> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(LedgerError::NotFound(what.to_string()));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LedgerError::Network(format!("{what}: HTTP {status}: {body}")));
    }
    response
        .bytes()
        .await
        .map_err(|e| LedgerError::Network(format!("{what}: {e}")))
}

fn record_from_node(node: TransactionNode) -> LedgerResult<TransactionRecord> {
    let id = TransactionId::new(node.id)
        .map_err(|e| LedgerError::Malformed(format!("transaction id: {e}")))?;
    Ok(TransactionRecord {
        id,
        tags: Tags::from(node.tags),
        timestamp: node.timestamp,
    })
}
