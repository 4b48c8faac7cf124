//! Wire contract of the lookup exchange.
//!
//! A request carries the uppercased identifier as both record key and body,
//! plus three headers telling the resolver where to answer. A reply carries
//! the phone number as body and echoes the `correlationId` header.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const HEADER_CORRELATION_ID: &str = "correlationId";
pub const HEADER_REPLY_TOPIC: &str = "replyTopic";
pub const HEADER_REPLY_PARTITION: &str = "replyPartition";

/// Replies are always requested on partition 0 of the reply topic.
pub const REPLY_PARTITION_HINT: i32 = 0;

/// Identifier submitted by the caller, normalized to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey(String);

impl LookupKey {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token minted once per lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an id read back from a reply header.
    pub fn from_wire(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where requests go and where replies are expected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topics {
    pub request_topic: String,
    pub reply_topic: String,
    #[serde(default)]
    pub reply_partition: i32,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            request_topic: "phone-lookup-requests".to_string(),
            reply_topic: "phone-lookup-replies".to_string(),
            reply_partition: REPLY_PARTITION_HINT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    topic: String,
    key: LookupKey,
    correlation_id: CorrelationId,
    reply_topic: String,
    reply_partition: String,
}

impl RequestEnvelope {
    pub fn new(topics: &Topics, key: &LookupKey, correlation_id: CorrelationId) -> Self {
        Self {
            topic: topics.request_topic.clone(),
            key: key.clone(),
            correlation_id,
            reply_topic: topics.reply_topic.clone(),
            reply_partition: topics.reply_partition.to_string(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn key(&self) -> &LookupKey {
        &self.key
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn reply_topic(&self) -> &str {
        &self.reply_topic
    }

    /// Body of the published record.
    pub fn payload(&self) -> &str {
        self.key.as_str()
    }

    pub fn headers(&self) -> [(&'static str, &str); 3] {
        [
            (HEADER_CORRELATION_ID, self.correlation_id.as_str()),
            (HEADER_REPLY_TOPIC, self.reply_topic.as_str()),
            (HEADER_REPLY_PARTITION, self.reply_partition.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyEnvelope {
    pub value: Option<String>,
    pub correlation_id: Option<String>,
}

impl ReplyEnvelope {
    pub fn new(value: Option<&str>, correlation_id: Option<&str>) -> Self {
        Self {
            value: value.map(str::to_string),
            correlation_id: correlation_id.map(str::to_string),
        }
    }

    /// Decode a received record. Empty or non-UTF-8 payloads have no value;
    /// a missing, empty or non-UTF-8 `correlationId` header has no id.
    pub fn from_raw<'a, I>(payload: Option<&[u8]>, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a [u8]>)>,
    {
        let value = payload
            .and_then(|p| std::str::from_utf8(p).ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let correlation_id = headers
            .into_iter()
            .find(|(key, _)| *key == HEADER_CORRELATION_ID)
            .and_then(|(_, v)| v)
            .and_then(|v| std::str::from_utf8(v).ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Self {
            value,
            correlation_id,
        }
    }

    pub fn matches(&self, id: &CorrelationId) -> bool {
        self.correlation_id.as_deref() == Some(id.as_str())
    }
}
