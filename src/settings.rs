//! Application config file.
//!
//! ```json
//! {
//!   "broker": { "brokers": "kafka:9092", "group_id": "sms-gateway-replies" },
//!   "exchange": { "wait_budget_secs": 30 }
//! }
//! ```

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::bridge::{BridgeError, BridgeResult, ExchangeSettings};
use crate::kafka::BrokerConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub exchange: ExchangeSettings,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> BridgeResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| BridgeError::Config(format!("invalid JSON in {}: {}", path.display(), e)))
    }

    /// Load an explicitly named file, or `config.json` if present, or defaults.
    pub fn load(path: Option<&Path>) -> BridgeResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    info!("Loading {}", default_path.display());
                    Self::from_file(&default_path)
                } else {
                    debug!("No {}, using built-in defaults", DEFAULT_CONFIG_PATH);
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn with_overrides(mut self, brokers: Option<String>, group_id: Option<String>) -> Self {
        if let Some(brokers) = brokers {
            self.broker.brokers = brokers;
        }
        if let Some(group_id) = group_id {
            self.broker.group_id = group_id;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("phone-lookup-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"broker": {{"brokers": "kafka-1:9092", "sasl": {{"username": "u", "password": "p"}}}},
                "exchange": {{"wait_budget_secs": 10}}}}"#
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.broker.brokers, "kafka-1:9092");
        assert_eq!(config.broker.sasl.map(|s| s.mechanism).as_deref(), Some("PLAIN"));
        assert_eq!(config.exchange.wait_budget_secs, 10);
        assert_eq!(config.exchange.warmup_attempts, 20);
    }

    #[test]
    fn test_partial_broker_section() {
        let config: AppConfig =
            serde_json::from_str(r#"{"broker": {"group_id": "sms-gateway-replies"}}"#).unwrap();
        assert_eq!(config.broker.brokers, "localhost:9092");
        assert_eq!(config.broker.group_id, "sms-gateway-replies");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/phone-lookup.json")).unwrap_err();
        assert!(matches!(err, BridgeError::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default()
            .with_overrides(Some("kafka-9:9092".to_string()), None);
        assert_eq!(config.broker.brokers, "kafka-9:9092");
        assert_eq!(config.broker.group_id, "phone-lookup-replies");
    }
}
