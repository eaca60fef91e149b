use serde::{Deserialize, Serialize};

/// Endpoints and credentials for the external ledger.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// GraphQL index endpoint.
    pub index_url: String,
    /// Content gateway; raw fetches hit `<gateway>/<id>`, mutable fetches
    /// `<gateway>/mutable/<root>`.
    pub gateway_url: String,
    /// Upload service; transactions are posted to `<uploader>/tx`.
    pub uploader_url: String,
    /// Hex-encoded ed25519 seed of the uploading wallet.
    pub wallet_key: Option<String>,
    /// Index page size.
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            index_url: "https://uploader.irys.xyz/graphql".into(),
            gateway_url: "https://gateway.irys.xyz".into(),
            uploader_url: "https://uploader.irys.xyz".into(),
            wallet_key: None,
            page_size: 100,
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("index_url", &self.index_url)
            .field("gateway_url", &self.gateway_url)
            .field("uploader_url", &self.uploader_url)
            .field("wallet_key", &self.wallet_key.as_ref().map(|_| "<redacted>"))
            .field("page_size", &self.page_size)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
