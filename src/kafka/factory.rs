use std::time::Duration;

use async_trait::async_trait;
use log::info;
use rdkafka::{consumer::Consumer, producer::FutureProducer};

use crate::bridge::{
    BridgeError, BridgeResult, BrokerConnection, BrokerFactory, ExchangeSettings, Topics,
};
use crate::kafka::{
    BrokerConfig, CustomContext, KafkaPublisher, KafkaSubscriber, LoggingConsumer,
};

pub type KafkaConnection = BrokerConnection<KafkaPublisher, KafkaSubscriber>;

/// Opens rdkafka clients from a [`BrokerConfig`].
pub struct KafkaFactory {
    config: BrokerConfig,
    settings: ExchangeSettings,
}

impl KafkaFactory {
    pub fn new(config: BrokerConfig, settings: ExchangeSettings) -> Self {
        Self { config, settings }
    }

    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    fn unavailable(&self, message: impl ToString) -> BridgeError {
        BridgeError::BrokerUnavailable {
            brokers: self.config.brokers.clone(),
            message: message.to_string(),
        }
    }

    /// Consumer in `group_id` subscribed to `topic`, created only once a
    /// broker answered a metadata request.
    pub async fn subscribe(&self, group_id: &str, topic: &str) -> BridgeResult<LoggingConsumer> {
        self.config.validate()?;

        let consumer: LoggingConsumer = self
            .config
            .consumer_config(group_id)
            .create_with_context(CustomContext)
            .map_err(|e| self.unavailable(format!("consumer creation failed: {}", e)))?;

        let consumer = probe(consumer, self.settings.connect_timeout())
            .await
            .map_err(|e| self.unavailable(e))?;

        consumer
            .subscribe(&[topic])
            .map_err(|e| self.unavailable(format!("failed to subscribe to {}: {}", topic, e)))?;
        Ok(consumer)
    }

    pub fn producer(&self) -> BridgeResult<FutureProducer> {
        self.config
            .producer_config()
            .create()
            .map_err(|e| self.unavailable(format!("producer creation failed: {}", e)))
    }
}

/// Fetch cluster metadata on a blocking thread, handing the consumer back.
async fn probe(consumer: LoggingConsumer, timeout: Duration) -> Result<LoggingConsumer, String> {
    let (consumer, metadata) = tokio::task::spawn_blocking(move || {
        let metadata = consumer.fetch_metadata(None, timeout);
        (consumer, metadata)
    })
    .await
    .map_err(|e| format!("metadata probe task failed: {}", e))?;

    let metadata = metadata.map_err(|e| format!("metadata request failed: {}", e))?;
    info!(
        "Connected to {} broker(s), {} topic(s) visible",
        metadata.brokers().len(),
        metadata.topics().len()
    );
    Ok(consumer)
}

#[async_trait]
impl BrokerFactory for KafkaFactory {
    type Publisher = KafkaPublisher;
    type Subscriber = KafkaSubscriber;

    async fn connect(&self) -> BridgeResult<(KafkaPublisher, KafkaSubscriber)> {
        let topics = &self.config.topics;
        let consumer = self.subscribe(&self.config.group_id, &topics.reply_topic).await?;
        let producer = self.producer()?;

        info!(
            "Broker connection ready: requests to {}, replies on {} (group {})",
            topics.request_topic, topics.reply_topic, self.config.group_id
        );
        Ok((
            KafkaPublisher::new(producer, self.settings.flush_timeout()),
            KafkaSubscriber::new(consumer),
        ))
    }

    fn topics(&self) -> &Topics {
        &self.config.topics
    }

    fn settings(&self) -> &ExchangeSettings {
        &self.settings
    }
}
