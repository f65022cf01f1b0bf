//! In-process event bus backed by a tokio channel. Used when both services
//! run in one process and in tests.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{BrokerError, EventPublisher, SettlementConsumer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct ChannelBus {
    tx: mpsc::Sender<BusMessage>,
}

#[derive(Debug)]
pub struct ChannelReceiver {
    rx: mpsc::Receiver<BusMessage>,
}

impl ChannelBus {
    pub fn new(buffer: usize) -> (Self, ChannelReceiver) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, ChannelReceiver { rx })
    }
}

#[async_trait]
impl EventPublisher for ChannelBus {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), BrokerError> {
        self.tx
            .send(BusMessage {
                topic: topic.to_string(),
                key: key.to_string(),
                payload: payload.to_vec(),
            })
            .await
            .map_err(|_| BrokerError::Publish {
                topic: topic.to_string(),
                reason: "channel closed".to_string(),
            })
    }
}

impl ChannelReceiver {
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<BusMessage> {
        self.rx.try_recv().ok()
    }

    /// Feeds every message on `topic` through `consumer` until all senders
    /// are dropped. A message whose processing fails is retried in place so
    /// later messages never overtake it.
    pub async fn run(mut self, topic: &str, consumer: SettlementConsumer) {
        while let Some(message) = self.rx.recv().await {
            if message.topic != topic {
                tracing::debug!(topic = %message.topic, "ignoring message for another topic");
                continue;
            }
            loop {
                match consumer.process(&message.key, &message.payload).await {
                    Ok(delivery) => {
                        tracing::debug!(key = %message.key, ?delivery, "message processed");
                        break;
                    }
                    Err(err) => {
                        tracing::error!(key = %message.key, error = %err, "message processing failed, retrying");
                        tokio::time::sleep(consumer.backoff()).await;
                    }
                }
            }
        }
        tracing::info!(topic, "channel bus closed");
    }
}
