use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use mcps_ledger::LedgerConfig;
use mcps_records::RecordsConfig;

use crate::error::{ServerError, ServerResult};

/// Complete process configuration, built once at startup.
///
/// Sources, later ones winning: built-in defaults, an optional TOML file, then
/// `MCPS_*` environment variables.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ledger_backend: LedgerBackend,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub ledger: LedgerConfig,
    pub records: RecordsConfig,
}

/// Which ledger the server talks to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Http,
    /// Process-local ledger; contents vanish on exit.
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = ServerError;

    fn from_str(s: &str) -> ServerResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "memory" => Ok(Self::Memory),
            other => Err(ServerError::Config(format!("unknown ledger backend: {other}"))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Origins allowed by CORS. Empty means no cross-origin access.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            allowed_origins: vec![
                "http://localhost:3000".into(),
                "http://localhost:5000".into(),
            ],
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    /// Shared secret the API-key cipher key is derived from.
    pub secret_key: Option<String>,
    /// Plaintext API key clients must present (encrypted) in `x-api-key`.
    pub api_key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { enabled: true, secret_key: None, api_key: None }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AppConfig {
    /// Load from an optional TOML file and apply process environment
    /// overrides. Call [`AppConfig::validate`] before serving.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Apply `MCPS_*` overrides read through `lookup`.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ServerResult<()> {
        if let Some(v) = lookup("MCPS_BIND") {
            self.server.bind_addr = v
                .parse()
                .map_err(|e| ServerError::Config(format!("MCPS_BIND: {e}")))?;
        }
        if let Some(v) = lookup("MCPS_ALLOWED_ORIGINS") {
            self.server.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = lookup("MCPS_AUTH_ENABLED") {
            self.auth.enabled = parse_bool("MCPS_AUTH_ENABLED", &v)?;
        }
        if let Some(v) = lookup("MCPS_SECRET_KEY") {
            self.auth.secret_key = Some(v);
        }
        if let Some(v) = lookup("MCPS_API_KEY") {
            self.auth.api_key = Some(v);
        }
        if let Some(v) = lookup("MCPS_LEDGER_BACKEND") {
            self.ledger_backend = v.parse()?;
        }
        if let Some(v) = lookup("MCPS_WALLET_KEY") {
            self.ledger.wallet_key = Some(v);
        }
        if let Some(v) = lookup("MCPS_INDEX_URL") {
            self.ledger.index_url = v;
        }
        if let Some(v) = lookup("MCPS_GATEWAY_URL") {
            self.ledger.gateway_url = v;
        }
        if let Some(v) = lookup("MCPS_UPLOADER_URL") {
            self.ledger.uploader_url = v;
        }
        if let Some(v) = lookup("MCPS_FETCH_CONCURRENCY") {
            self.records.fetch_concurrency = v
                .parse()
                .map_err(|e| ServerError::Config(format!("MCPS_FETCH_CONCURRENCY: {e}")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.auth.enabled {
            if self.auth.secret_key.as_deref().map_or(true, str::is_empty) {
                return Err(ServerError::Config(
                    "auth.secret_key is required when auth is enabled".into(),
                ));
            }
            if self.auth.api_key.as_deref().map_or(true, str::is_empty) {
                return Err(ServerError::Config(
                    "auth.api_key is required when auth is enabled".into(),
                ));
            }
        }
        if self.records.fetch_concurrency == 0 {
            return Err(ServerError::Config("records.fetch_concurrency must be positive".into()));
        }
        if self.ledger_backend == LedgerBackend::Http && self.ledger.wallet_key.is_none() {
            return Err(ServerError::Config(
                "ledger.wallet_key is required for the http ledger backend".into(),
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn in_memory_for_tests() -> Self {
        Self {
            ledger_backend: LedgerBackend::Memory,
            auth: AuthConfig {
                enabled: true,
                secret_key: Some("test-secret".into()),
                api_key: Some("test-api-key".into()),
            },
            ..Self::default()
        }
    }
}

fn parse_bool(key: &str, value: &str) -> ServerResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ServerError::Config(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let c = AppConfig::default();
        assert_eq!(c.server.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(c.ledger_backend, LedgerBackend::Http);
        assert!(c.auth.enabled);
        assert_eq!(c.records.fetch_concurrency, 16);
    }

    #[test]
    fn parses_partial_toml() {
        let c = AppConfig::from_toml(
            r#"
            ledger_backend = "memory"

            [server]
            bind_addr = "0.0.0.0:8080"
            allowed_origins = ["https://app.example"]

            [auth]
            secret_key = "s"
            api_key = "k"

            [records]
            record_class = "Notes"
            "#,
        )
        .unwrap();
        assert_eq!(c.ledger_backend, LedgerBackend::Memory);
        assert_eq!(c.server.bind_addr.port(), 8080);
        assert_eq!(c.server.allowed_origins, vec!["https://app.example"]);
        assert_eq!(c.records.record_class, "Notes");
        assert_eq!(c.records.fetch_concurrency, 16);
        assert_eq!(c.ledger.page_size, 100);
        c.validate().unwrap();
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind_addr = \"127.0.0.1:9999\"").unwrap();
        let c = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(c.server.bind_addr.port(), 9999);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("server = 3").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn env_overrides_win() {
        let mut c = AppConfig::default();
        c.apply_env_overrides(env(&[
            ("MCPS_BIND", "0.0.0.0:4000"),
            ("MCPS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("MCPS_SECRET_KEY", "secret"),
            ("MCPS_API_KEY", "key"),
            ("MCPS_WALLET_KEY", "ab"),
            ("MCPS_GATEWAY_URL", "http://gw.local"),
            ("MCPS_LEDGER_BACKEND", "Memory"),
            ("MCPS_AUTH_ENABLED", "off"),
        ]))
        .unwrap();
        assert_eq!(c.server.bind_addr.port(), 4000);
        assert_eq!(c.server.allowed_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(c.auth.secret_key.as_deref(), Some("secret"));
        assert_eq!(c.auth.api_key.as_deref(), Some("key"));
        assert_eq!(c.ledger.wallet_key.as_deref(), Some("ab"));
        assert_eq!(c.ledger.gateway_url, "http://gw.local");
        assert_eq!(c.ledger_backend, LedgerBackend::Memory);
        assert!(!c.auth.enabled);
    }

    #[test]
    fn bad_env_values_are_rejected() {
        let mut c = AppConfig::default();
        assert!(c.apply_env_overrides(env(&[("MCPS_BIND", "nowhere")])).is_err());
        assert!(c.apply_env_overrides(env(&[("MCPS_LEDGER_BACKEND", "disk")])).is_err());
        assert!(c.apply_env_overrides(env(&[("MCPS_AUTH_ENABLED", "maybe")])).is_err());
    }

    #[test]
    fn validation_requires_auth_secrets() {
        let mut c = AppConfig::in_memory_for_tests();
        c.validate().unwrap();

        c.auth.api_key = None;
        assert!(c.validate().is_err());

        c.auth.enabled = false;
        c.validate().unwrap();
    }

    #[test]
    fn http_backend_requires_wallet() {
        let mut c = AppConfig::in_memory_for_tests();
        c.ledger_backend = LedgerBackend::Http;
        assert!(c.validate().is_err());
        c.ledger.wallet_key = Some("00".repeat(32));
        c.validate().unwrap();
    }

    #[test]
    fn debug_redacts_secrets() {
        let c = AppConfig::in_memory_for_tests();
        let dbg = format!("{:?}", c.auth);
        assert!(!dbg.contains("test-secret"));
        assert!(!dbg.contains("test-api-key"));
    }
}
