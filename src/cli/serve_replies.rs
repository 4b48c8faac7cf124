use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use log::{debug, info, warn};
use rdkafka::{
    message::Headers,
    producer::{FutureProducer, FutureRecord},
    Message,
};

use crate::{
    bridge::{LookupKey, HEADER_CORRELATION_ID, HEADER_REPLY_PARTITION, HEADER_REPLY_TOPIC},
    kafka::{owned_headers, KafkaFactory, MESSAGE_HEADER_REPLIED_AT},
};

/// Identifier → phone number table answered by the responder.
#[derive(Debug, Default)]
pub struct Directory {
    entries: HashMap<String, String>,
}

impl Directory {
    /// Read and parse a JSON object of identifiers to phone numbers
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read file: {}", path.display()))?;

        let entries: HashMap<String, String> = serde_json::from_str(&content)
            .context(format!("Invalid JSON in file: {}", path.display()))?;

        Ok(Self::from_entries(entries))
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let entries = entries
            .into_iter()
            .map(|(id, phone)| (LookupKey::new(&id).as_str().to_string(), phone))
            .filter(|(id, phone)| !id.is_empty() && !phone.trim().is_empty())
            .collect();
        Self { entries }
    }

    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.entries
            .get(LookupKey::new(id).as_str())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A lookup request read off the request topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingRequest {
    pub key: String,
    pub correlation_id: String,
    pub reply_topic: String,
    pub reply_partition: Option<i32>,
}

impl IncomingRequest {
    /// `None` when the body or the correlation/reply-topic headers are missing.
    pub fn from_raw<'a, I>(payload: Option<&[u8]>, headers: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a [u8]>)>,
    {
        let key = payload
            .and_then(|p| std::str::from_utf8(p).ok())
            .map(str::trim)
            .filter(|k| !k.is_empty())?
            .to_string();

        let mut correlation_id = None;
        let mut reply_topic = None;
        let mut reply_partition = None;
        for (name, value) in headers {
            let Some(value) = value.and_then(|v| std::str::from_utf8(v).ok()) else {
                continue;
            };
            match name {
                HEADER_CORRELATION_ID => correlation_id = Some(value.to_string()),
                HEADER_REPLY_TOPIC => reply_topic = Some(value.to_string()),
                HEADER_REPLY_PARTITION => reply_partition = value.trim().parse().ok(),
                _ => {}
            }
        }

        Some(Self {
            key,
            correlation_id: correlation_id.filter(|c| !c.is_empty())?,
            reply_topic: reply_topic.filter(|t| !t.is_empty())?,
            reply_partition,
        })
    }

    fn from_message<M: Message>(message: &M) -> Option<Self> {
        let headers: Vec<(&str, Option<&[u8]>)> = message
            .headers()
            .map(|headers| headers.iter().map(|h| (h.key, h.value)).collect())
            .unwrap_or_default();
        Self::from_raw(message.payload(), headers)
    }
}

pub async fn serve_replies(factory: &KafkaFactory, directory_path: &Path) -> Result<(), anyhow::Error> {
    let directory = Directory::load(directory_path)?;
    if directory.is_empty() {
        return Err(anyhow!("Directory {} has no entries", directory_path.display()));
    }

    let config = factory.config();
    let consumer = factory
        .subscribe(&config.responder_group_id, &config.topics.request_topic)
        .await
        .context("Consumer creation failed")?;
    let producer = factory.producer().context("Producer creation failed")?;

    info!(
        "Answering {} identifier(s) from {} on {}",
        directory.len(),
        directory_path.display(),
        config.topics.request_topic
    );
    println!("Serving replies, press Ctrl-C to stop");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let request = tokio::select! {
            _ = &mut shutdown => {
                info!("Stopping responder");
                break;
            }
            received = consumer.recv() => match received {
                Err(e) => {
                    warn!("Kafka error: {}", e);
                    continue;
                }
                Ok(m) => match IncomingRequest::from_message(&m) {
                    Some(request) => request,
                    None => {
                        warn!("Request without body or reply headers, skipping");
                        continue;
                    }
                },
            },
        };

        match directory.resolve(&request.key) {
            Some(phone) => {
                if let Err(e) = send_reply(&producer, &request, phone).await {
                    warn!("Failed to reply to {}: {}", request.correlation_id, e);
                }
            }
            None => debug!("No entry for {}, not replying", request.key),
        }
    }

    Ok(())
}

async fn send_reply(
    producer: &FutureProducer,
    request: &IncomingRequest,
    phone: &str,
) -> Result<(), anyhow::Error> {
    let replied_at = chrono::Utc::now().to_rfc3339();
    let headers = owned_headers([
        (HEADER_CORRELATION_ID, request.correlation_id.as_str()),
        (MESSAGE_HEADER_REPLIED_AT, replied_at.as_str()),
    ]);

    let mut record = FutureRecord::to(&request.reply_topic)
        .key(&request.key)
        .payload(phone)
        .headers(headers);
    if let Some(partition) = request.reply_partition {
        record = record.partition(partition);
    }

    producer
        .send(record, Duration::from_secs(0))
        .await
        .map_err(|(err, _)| anyhow!("Failed to publish: {}", err))?;

    info!("Answered {} for request {}", request.key, request.correlation_id);
    Ok(())
}
