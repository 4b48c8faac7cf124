use anyhow::Context;
use colored::Colorize;

use crate::{
    bridge::BrokerFactory,
    kafka::{KafkaConnection, KafkaFactory},
};

pub async fn check_connection(factory: &KafkaFactory) -> Result<(), anyhow::Error> {
    let topics = factory.topics();
    println!("🔗 Brokers: {}", factory.config().brokers);
    println!("📤 Request topic: {}", topics.request_topic);
    println!("📥 Reply topic:   {}", topics.reply_topic);

    let connection = KafkaConnection::open(factory)
        .await
        .context("Broker unreachable")?;

    let ready = connection.ready().await;
    connection.close().await;
    let partitions = ready.context("Reply subscriber was not assigned")?;

    println!(
        "{} reply subscriber assigned {} partition(s)",
        "✅".green(),
        partitions
    );
    Ok(())
}
