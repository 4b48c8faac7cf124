use log::{info, warn};
use rdkafka::{
    consumer::{ConsumerContext, Rebalance, StreamConsumer},
    error::KafkaResult,
    ClientContext, TopicPartitionList,
};

/// Logs group membership changes; warmup depends on the assignment they bring.
pub struct CustomContext;

impl ClientContext for CustomContext {}

impl ConsumerContext for CustomContext {
    fn pre_rebalance(&self, rebalance: &Rebalance) {
        info!("Pre rebalance: {}", describe(rebalance));
    }

    fn post_rebalance(&self, rebalance: &Rebalance) {
        info!("Post rebalance: {}", describe(rebalance));
    }

    fn commit_callback(&self, result: KafkaResult<()>, _offsets: &TopicPartitionList) {
        if let Err(e) = result {
            warn!("Offset commit failed: {}", e);
        }
    }
}

fn describe(rebalance: &Rebalance) -> String {
    match rebalance {
        Rebalance::Assign(partitions) => format!("assign {} partition(s)", partitions.count()),
        Rebalance::Revoke(partitions) => format!("revoke {} partition(s)", partitions.count()),
        Rebalance::Error(e) => format!("error {}", e),
    }
}

/// Consumer type shared by the reply subscriber and the responder.
pub type LoggingConsumer = StreamConsumer<CustomContext>;
