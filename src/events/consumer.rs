//! Delivery policy for settlement events: decode, apply with bounded
//! retry, and park what cannot be applied.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};

use super::{BrokerError, EventPublisher, PaymentEventData, SettlementEvent};
use crate::{
    config::BrokerConfig,
    error::{AppError, AppResult},
};

/// Applies one decoded settlement event. Must be idempotent, since the
/// broker delivers at least once.
#[async_trait]
pub trait SettlementHandler: Send + Sync {
    async fn handle(&self, data: &PaymentEventData) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Handled,
    /// Payload could not be decoded.
    Dropped,
    /// Handler kept failing; payload was copied to the parked topic.
    Parked,
}

pub struct SettlementConsumer {
    handler: Arc<dyn SettlementHandler>,
    parking: Arc<dyn EventPublisher>,
    parked_topic: String,
    max_retry: usize,
    backoff: Duration,
}

impl SettlementConsumer {
    pub fn new(
        handler: Arc<dyn SettlementHandler>,
        parking: Arc<dyn EventPublisher>,
        config: &BrokerConfig,
    ) -> Self {
        Self {
            handler,
            parking,
            parked_topic: config.parked_topic(),
            max_retry: config.max_retry,
            backoff: config.backoff,
        }
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    fn retry_policy(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.backoff)
            .with_max_delay(self.backoff * 8)
            .with_max_times(self.max_retry)
    }

    /// Processes one message. `Ok` means the offset may be committed; an
    /// `Err` means parking itself failed and the message must be redelivered.
    pub async fn process(&self, key: &str, payload: &[u8]) -> Result<Delivery, BrokerError> {
        let event: SettlementEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(key, error = %err, "dropping undecodable settlement event");
                return Ok(Delivery::Dropped);
            }
        };
        let data = &event.body.data;

        let outcome = (|| async { self.handler.handle(data).await })
            .retry(self.retry_policy())
            .when(is_transient)
            .notify(|err: &AppError, after: Duration| {
                tracing::warn!(
                    order_id = %data.order_id,
                    error = %err,
                    retry_in = ?after,
                    "settlement event failed, retrying"
                );
            })
            .await;

        match outcome {
            Ok(()) => Ok(Delivery::Handled),
            Err(err) => {
                tracing::error!(
                    order_id = %data.order_id,
                    status = %data.status,
                    error = %err,
                    topic = %self.parked_topic,
                    "parking settlement event"
                );
                self.parking.publish(&self.parked_topic, key, payload).await?;
                Ok(Delivery::Parked)
            }
        }
    }
}

fn is_transient(err: &AppError) -> bool {
    !matches!(err, AppError::NotFound(_) | AppError::BadRequest(_))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::{config::BrokerKind, events::ChannelBus, models::TransactionStatus};

    struct Flaky {
        calls: AtomicUsize,
        failures: usize,
        error: fn() -> AppError,
    }

    #[async_trait]
    impl SettlementHandler for Flaky {
        async fn handle(&self, _data: &PaymentEventData) -> AppResult<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err((self.error)())
            } else {
                Ok(())
            }
        }
    }

    fn config(max_retry: usize) -> BrokerConfig {
        BrokerConfig {
            kind: BrokerKind::Channel,
            brokers: String::new(),
            topic: "payment-service-callback".into(),
            group_id: "order-service".into(),
            max_retry,
            backoff: Duration::from_millis(1),
        }
    }

    fn payload() -> Vec<u8> {
        let event = SettlementEvent::new(
            "payment-service",
            PaymentEventData {
                order_id: Uuid::new_v4(),
                payment_id: Uuid::new_v4(),
                status: TransactionStatus::Settlement,
                paid_at: Some(Utc::now()),
                expired_at: Utc::now(),
            },
        );
        serde_json::to_vec(&event).unwrap()
    }

    fn flaky(failures: usize, error: fn() -> AppError) -> Arc<Flaky> {
        Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            failures,
            error,
        })
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let handler = flaky(2, || AppError::upstream("field-service", "timeout"));
        let (bus, mut parked) = ChannelBus::new(4);
        let consumer = SettlementConsumer::new(handler.clone(), Arc::new(bus), &config(3));

        let delivery = consumer.process("key", &payload()).await.unwrap();
        assert_eq!(delivery, Delivery::Handled);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
        assert!(parked.try_recv().is_none());
    }

    #[tokio::test]
    async fn exhausted_retries_park_the_message() {
        let handler = flaky(usize::MAX, || AppError::upstream("field-service", "down"));
        let (bus, mut parked) = ChannelBus::new(4);
        let consumer = SettlementConsumer::new(handler.clone(), Arc::new(bus), &config(2));
        let raw = payload();

        let delivery = consumer.process("order-key", &raw).await.unwrap();
        assert_eq!(delivery, Delivery::Parked);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);

        let message = parked.try_recv().expect("parked message");
        assert_eq!(message.topic, "payment-service-callback.parked");
        assert_eq!(message.key, "order-key");
        assert_eq!(message.payload, raw);
    }

    #[tokio::test]
    async fn missing_order_is_parked_without_retry() {
        let handler = flaky(usize::MAX, || AppError::NotFound("order"));
        let (bus, mut parked) = ChannelBus::new(4);
        let consumer = SettlementConsumer::new(handler.clone(), Arc::new(bus), &config(5));

        assert_eq!(consumer.process("k", &payload()).await.unwrap(), Delivery::Parked);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert!(parked.try_recv().is_some());
    }

    #[tokio::test]
    async fn garbage_is_dropped() {
        let handler = flaky(0, || AppError::Unauthorized);
        let (bus, mut parked) = ChannelBus::new(4);
        let consumer = SettlementConsumer::new(handler.clone(), Arc::new(bus), &config(3));

        assert_eq!(consumer.process("k", b"not json").await.unwrap(), Delivery::Dropped);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert!(parked.try_recv().is_none());
    }

    #[tokio::test]
    async fn closed_parking_topic_is_an_error() {
        let handler = flaky(usize::MAX, || AppError::upstream("field-service", "down"));
        let (bus, parked) = ChannelBus::new(4);
        drop(parked);
        let consumer = SettlementConsumer::new(handler, Arc::new(bus), &config(0));

        assert!(consumer.process("k", &payload()).await.is_err());
    }
}
