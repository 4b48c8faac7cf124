//! Request/reply lookups over a publish/subscribe broker.
//!
//! ```text
//!  caller ──exchange──► RequestEnvelope ──publish──► request topic
//!     ▲                                                   │
//!     │                                                resolver
//!     │                                                   ▼
//!  ReplyRouter ◄──dispatch── reply reader ◄──poll── reply topic
//!     ▲                      warmup / keepalive ──poll──┘
//! ```

pub mod connection;
pub mod envelope;
pub mod error;
pub mod keepalive;
pub mod lookup;
mod reader;
pub mod router;
pub mod settings;
mod task;
pub mod transport;
pub mod warmup;

pub use connection::BrokerConnection;
pub use envelope::{
    CorrelationId, LookupKey, ReplyEnvelope, RequestEnvelope, Topics, HEADER_CORRELATION_ID,
    HEADER_REPLY_PARTITION, HEADER_REPLY_TOPIC,
};
pub use error::{BridgeError, BridgeResult};
pub use keepalive::KeepaliveTask;
pub use lookup::lookup_phone;
pub use router::{Dispatch, PendingReply, ReplyRouter};
pub use settings::ExchangeSettings;
pub use transport::{BrokerFactory, Publisher, Subscriber};
pub use warmup::{Warmup, WarmupStatus};
