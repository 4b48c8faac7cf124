//! Phone number lookups answered over Kafka.
//!
//! A lookup publishes the identifier on a request topic and waits, bounded
//! by a wait budget, for the reply carrying the same correlation id on a
//! shared reply topic. See [`bridge`] for the exchange and its lifecycle,
//! [`kafka`] for the rdkafka clients.

pub mod bridge;
pub mod cli;
pub mod kafka;
pub mod settings;
