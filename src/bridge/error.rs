//! Error types for the lookup bridge.
//!
//! | Error Type | Degrades to "not found" | Description |
//! |------------|-------------------------|-------------|
//! | `BrokerUnavailable` | Yes | No broker accepted the initial connection |
//! | `AssignmentTimeout` | Yes | Warmup never obtained a partition assignment |
//! | `Kafka` | Yes | Publish, flush or poll failed |
//! | `Closed` | Yes | The connection was closed |
//! | `Config` | No | Configuration invalid |
//! | `Internal` | Yes | A blocking helper task panicked |
//!
//! A lookup that times out is not an error: the exchange returns `Ok(None)`.
//! A reply without a usable correlation id is not an error either, it is
//! dropped by the router.

use thiserror::Error;

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[derive(Error, Debug)]
pub enum BridgeError {
    /// No broker answered within the connect timeout.
    #[error("No broker reachable at {brokers}: {message}")]
    BrokerUnavailable { brokers: String, message: String },

    /// The subscriber still had no partition after every warmup attempt.
    #[error("Reply topic {topic} not assigned after {attempts} warmup attempts")]
    AssignmentTimeout { topic: String, attempts: u32 },

    /// rdkafka client error while publishing or polling.
    #[error("Kafka error ({operation}): {source}")]
    Kafka {
        operation: &'static str,
        #[source]
        source: rdkafka::error::KafkaError,
    },

    /// The connection was closed, before or during the call.
    #[error("Broker connection closed")]
    Closed,

    #[error("Configuration error: {0}")]
    Config(String),

    /// A background task failed to hand back its result.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    pub fn kafka(operation: &'static str, source: rdkafka::error::KafkaError) -> Self {
        Self::Kafka { operation, source }
    }

    /// Errors the HTTP-facing caller absorbs as "not found".
    pub fn is_degraded(&self) -> bool {
        match self {
            Self::BrokerUnavailable { .. } => true,
            Self::AssignmentTimeout { .. } => true,
            Self::Kafka { .. } => true,
            Self::Closed => true,
            Self::Config(_) => false,
            Self::Internal(_) => true,
        }
    }
}
