use serde::{Deserialize, Serialize};

use mcps_types::DEFAULT_RECORD_CLASS;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    /// Value of the `class` tag that marks this application's records.
    pub record_class: String,
    /// Upper bound on concurrent content fetches during retrieval.
    pub fetch_concurrency: usize,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            record_class: DEFAULT_RECORD_CLASS.into(),
            fetch_concurrency: 16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = RecordsConfig::default();
        assert_eq!(c.record_class, "MCP-Storage");
        assert_eq!(c.fetch_concurrency, 16);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c: RecordsConfig = serde_json::from_str(r#"{"fetch_concurrency": 4}"#).unwrap();
        assert_eq!(c.fetch_concurrency, 4);
        assert_eq!(c.record_class, "MCP-Storage");
    }
}
