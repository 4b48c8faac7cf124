use std::fmt;

use rdkafka::{config::RDKafkaLogLevel, ClientConfig};
use serde::{Deserialize, Serialize};

use crate::bridge::{BridgeError, BridgeResult, Topics};

// Kafka configuration key constants
pub const BOOTSTRAP_SERVERS: &str = "bootstrap.servers";
pub const CLIENT_ID: &str = "client.id";
pub const GROUP_ID: &str = "group.id";
pub const AUTO_OFFSET_RESET: &str = "auto.offset.reset";
pub const ENABLE_AUTO_COMMIT: &str = "enable.auto.commit";
pub const SESSION_TIMEOUT_MS: &str = "session.timeout.ms";
pub const MAX_POLL_INTERVAL_MS: &str = "max.poll.interval.ms";
pub const MESSAGE_TIMEOUT_MS: &str = "message.timeout.ms";
pub const SECURITY_PROTOCOL: &str = "security.protocol";
pub const SASL_MECHANISMS: &str = "sasl.mechanisms";
pub const SASL_USERNAME: &str = "sasl.username";
pub const SASL_PASSWORD: &str = "sasl.password";
pub const SSL_CA_LOCATION: &str = "ssl.ca.location";
pub const SSL_CERTIFICATE_LOCATION: &str = "ssl.certificate.location";
pub const SSL_KEY_LOCATION: &str = "ssl.key.location";
pub const SSL_KEY_PASSWORD: &str = "ssl.key.password";

// The keepalive interval must stay below MAX_POLL_INTERVAL.
pub const SESSION_TIMEOUT: &str = "1800000"; // 30 minutes
pub const MAX_POLL_INTERVAL: &str = "3600000"; // 60 minutes

// Timeout value (in milliseconds)
pub const TIMEOUT_MS: &str = "6000"; // 6 seconds

// Kafka message headers added by the responder
pub const MESSAGE_HEADER_REPLIED_AT: &str = "repliedAt";

/// Where and how to reach the broker.
///
/// # JSON Example
///
/// ```json
/// {
///   "brokers": "kafka-1:9093,kafka-2:9093",
///   "client_id": "sms-gateway",
///   "group_id": "sms-gateway-replies",
///   "topics": {
///     "request_topic": "phone-lookup-requests",
///     "reply_topic": "phone-lookup-replies"
///   },
///   "sasl": { "username": "sms", "password": "secret" },
///   "tls": { "ca_location": "/etc/kafka/ca.pem" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Comma-separated `host:port` list.
    #[serde(default = "default_brokers")]
    pub brokers: String,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Consumer group of the reply subscriber.
    #[serde(default = "default_group_id")]
    pub group_id: String,

    /// Consumer group used by `serve-replies`.
    #[serde(default = "default_responder_group_id")]
    pub responder_group_id: String,

    #[serde(default)]
    pub topics: Topics,

    #[serde(default)]
    pub sasl: Option<SaslConfig>,

    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

fn default_brokers() -> String {
    "localhost:9092".to_string()
}
fn default_client_id() -> String {
    "phone-lookup".to_string()
}
fn default_group_id() -> String {
    "phone-lookup-replies".to_string()
}
fn default_responder_group_id() -> String {
    "phone-lookup-responder".to_string()
}
fn default_sasl_mechanism() -> String {
    "PLAIN".to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            client_id: default_client_id(),
            group_id: default_group_id(),
            responder_group_id: default_responder_group_id(),
            topics: Topics::default(),
            sasl: None,
            tls: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SaslConfig {
    pub username: String,
    pub password: String,
    #[serde(default = "default_sasl_mechanism")]
    pub mechanism: String,
}

impl fmt::Debug for SaslConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslConfig")
            .field("username", &self.username)
            .field("password", &"***")
            .field("mechanism", &self.mechanism)
            .finish()
    }
}

/// Paths of the mutual-TLS material. Any subset may be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub ca_location: Option<String>,
    #[serde(default)]
    pub certificate_location: Option<String>,
    #[serde(default)]
    pub key_location: Option<String>,
    #[serde(default)]
    pub key_password: Option<String>,
}

impl BrokerConfig {
    pub fn validate(&self) -> BridgeResult<()> {
        if self.broker_list().is_empty() {
            return Err(BridgeError::Config("brokers must not be empty".to_string()));
        }
        if self.group_id.trim().is_empty() {
            return Err(BridgeError::Config("group_id must not be empty".to_string()));
        }
        if self.topics.request_topic.is_empty() || self.topics.reply_topic.is_empty() {
            return Err(BridgeError::Config(
                "request and reply topics must be set".to_string(),
            ));
        }
        if let Some(tls) = &self.tls {
            if tls.certificate_location.is_some() != tls.key_location.is_some() {
                return Err(BridgeError::Config(
                    "tls certificate_location and key_location must be set together".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Brokers with whitespace and empty entries removed.
    pub fn broker_list(&self) -> Vec<&str> {
        self.brokers
            .split(',')
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .collect()
    }

    pub fn security_protocol(&self) -> &'static str {
        match (self.sasl.is_some(), self.tls.is_some()) {
            (true, true) => "SASL_SSL",
            (true, false) => "SASL_PLAINTEXT",
            (false, true) => "SSL",
            (false, false) => "PLAINTEXT",
        }
    }

    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set(BOOTSTRAP_SERVERS, self.broker_list().join(","))
            .set(CLIENT_ID, &self.client_id)
            .set(SECURITY_PROTOCOL, self.security_protocol())
            .set_log_level(RDKafkaLogLevel::Warning);

        if let Some(sasl) = &self.sasl {
            config
                .set(SASL_MECHANISMS, &sasl.mechanism)
                .set(SASL_USERNAME, &sasl.username)
                .set(SASL_PASSWORD, &sasl.password);
        }

        if let Some(tls) = &self.tls {
            let paths = [
                (SSL_CA_LOCATION, &tls.ca_location),
                (SSL_CERTIFICATE_LOCATION, &tls.certificate_location),
                (SSL_KEY_LOCATION, &tls.key_location),
                (SSL_KEY_PASSWORD, &tls.key_password),
            ];
            for (key, value) in paths {
                if let Some(value) = value {
                    config.set(key, value);
                }
            }
        }
        config
    }

    /// Consumer settings: only new replies matter, offsets are auto-committed.
    pub fn consumer_config(&self, group_id: &str) -> ClientConfig {
        let mut config = self.client_config();
        config
            .set(GROUP_ID, group_id)
            .set(AUTO_OFFSET_RESET, "latest")
            .set(ENABLE_AUTO_COMMIT, "true")
            .set(SESSION_TIMEOUT_MS, SESSION_TIMEOUT)
            .set(MAX_POLL_INTERVAL_MS, MAX_POLL_INTERVAL);
        config
    }

    pub fn producer_config(&self) -> ClientConfig {
        let mut config = self.client_config();
        config.set(MESSAGE_TIMEOUT_MS, TIMEOUT_MS);
        config
    }
}
