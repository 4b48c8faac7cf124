//! Shared test utilities.

#![allow(dead_code)]

pub mod mock_broker;

pub use mock_broker::*;

use phone_lookup_bridge::bridge::BrokerConnection;

pub type MockConnection = BrokerConnection<MockPublisher, MockSubscriber>;

/// Open a connection on `broker` and wait for its warmup.
pub async fn ready_connection(broker: &MockBroker) -> MockConnection {
    let connection = MockConnection::open(&broker.factory()).await.unwrap();
    connection.ready().await.unwrap();
    connection
}
