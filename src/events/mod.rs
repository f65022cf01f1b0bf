//! Settlement events between the payment and order services.

use async_trait::async_trait;
use thiserror::Error;

pub mod channel;
pub mod consumer;
pub mod envelope;
#[cfg(feature = "kafka")]
pub mod kafka;

pub use channel::{BusMessage, ChannelBus, ChannelReceiver};
pub use consumer::{Delivery, SettlementConsumer, SettlementHandler};
pub use envelope::{PaymentEventData, SettlementEvent};

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("subscribe failed: {0}")]
    Subscribe(String),

    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Publishes raw payloads to a topic. The key decides the partition, so
/// events for one order stay in order.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), BrokerError>;
}
