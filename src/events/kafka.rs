//! Kafka transport for settlement events.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use rdkafka::{
    ClientConfig, ClientContext, Offset, TopicPartitionList,
    consumer::{CommitMode, Consumer, ConsumerContext, Rebalance, StreamConsumer},
    message::{Message, OwnedMessage},
    producer::{FutureProducer, FutureRecord},
};
use tokio::sync::mpsc;

use super::{BrokerError, EventPublisher, SettlementConsumer};
use crate::config::BrokerConfig;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

pub struct KafkaPublisher {
    producer: FutureProducer,
}

impl KafkaPublisher {
    pub fn new(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", "5000")
            .set("acks", "all")
            .create()
            .map_err(|e| BrokerError::Connection(format!("failed to create producer: {e}")))?;
        tracing::info!(brokers = %config.brokers, "kafka producer ready");
        Ok(Self { producer })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let record = FutureRecord::<str, [u8]>::to(topic).key(key).payload(payload);
        let (partition, offset) = self
            .producer
            .send(record, SEND_TIMEOUT)
            .await
            .map_err(|(e, _)| BrokerError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(topic, key, partition, offset, "published");
        Ok(())
    }
}

/// Queue depth at which a partition is paused, and the depth its worker must
/// drain to before the partition is resumed.
const PAUSE_AT: usize = 64;
const RESUME_AT: usize = 16;

/// Messages handed to a partition worker and not yet committed, plus whether
/// the partition is currently paused because of them.
#[derive(Debug, Default)]
struct Backlog {
    queued: AtomicUsize,
    paused: AtomicBool,
}

impl Backlog {
    /// Records a dispatched message; true when the partition should be paused.
    fn push(&self) -> bool {
        let queued = self.queued.fetch_add(1, Ordering::SeqCst) + 1;
        queued >= PAUSE_AT && !self.paused.swap(true, Ordering::SeqCst)
    }

    /// Records a finished message; true when the partition should be resumed.
    fn pop(&self) -> bool {
        let left = self.queued.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        left <= RESUME_AT && self.paused.swap(false, Ordering::SeqCst)
    }

    /// Re-check after pausing, in case the worker drained the queue before
    /// the pause flag was visible to it.
    fn settle(&self) -> bool {
        self.queued.load(Ordering::SeqCst) <= RESUME_AT && self.paused.swap(false, Ordering::SeqCst)
    }
}

/// Handle the dispatcher keeps for one partition worker.
struct PartitionWorker {
    tx: mpsc::UnboundedSender<OwnedMessage>,
    backlog: Arc<Backlog>,
    revoked: Arc<AtomicBool>,
}

/// Consumer context owning the partition workers, so a revocation stops the
/// workers of partitions this member no longer owns before they commit again.
pub struct PartitionContext {
    topic: String,
    workers: Mutex<HashMap<i32, PartitionWorker>>,
}

impl PartitionContext {
    fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            workers: Mutex::new(HashMap::new()),
        }
    }

    fn revoke(&self, partitions: &TopicPartitionList) {
        let Ok(mut workers) = self.workers.lock() else {
            return;
        };
        for element in partitions.elements_for_topic(&self.topic) {
            if let Some(worker) = workers.remove(&element.partition()) {
                worker.revoked.store(true, Ordering::SeqCst);
                tracing::info!(partition = element.partition(), "partition revoked, worker stopped");
            }
        }
    }
}

impl ClientContext for PartitionContext {}

impl ConsumerContext for PartitionContext {
    fn pre_rebalance(&self, rebalance: &Rebalance<'_>) {
        match rebalance {
            Rebalance::Revoke(partitions) => self.revoke(partitions),
            Rebalance::Assign(partitions) => {
                tracing::info!(count = partitions.count(), "partitions assigned");
            }
            Rebalance::Error(err) => tracing::error!(error = %err, "rebalance failed"),
        }
    }
}

type PartitionConsumer = StreamConsumer<PartitionContext>;

fn partition_list(topic: &str, partition: i32) -> TopicPartitionList {
    let mut list = TopicPartitionList::new();
    list.add_partition(topic, partition);
    list
}

/// Consumes `config.topic` until the stream ends. Each partition gets its own
/// worker task so messages of one partition are applied in order while
/// partitions proceed independently. The dispatcher never waits on a worker:
/// a partition whose queue reaches `PAUSE_AT` is paused and resumed once its
/// worker catches up. Offsets are committed only after a message was handled,
/// dropped, or parked.
pub async fn run_consumer(
    config: &BrokerConfig,
    handler: Arc<SettlementConsumer>,
) -> Result<(), BrokerError> {
    let consumer: PartitionConsumer = ClientConfig::new()
        .set("bootstrap.servers", &config.brokers)
        .set("group.id", &config.group_id)
        .set("enable.auto.commit", "false")
        .set("auto.offset.reset", "earliest")
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "6000")
        .create_with_context(PartitionContext::new(&config.topic))
        .map_err(|e| BrokerError::Connection(format!("failed to create consumer: {e}")))?;
    consumer
        .subscribe(&[config.topic.as_str()])
        .map_err(|e| BrokerError::Subscribe(e.to_string()))?;
    let consumer = Arc::new(consumer);
    tracing::info!(topic = %config.topic, group = %config.group_id, "kafka consumer started");

    let mut stream = consumer.stream();
    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message.detach(),
            Err(err) => {
                tracing::error!(error = %err, "kafka consumer error");
                continue;
            }
        };
        dispatch(&consumer, &handler, message);
    }
    Ok(())
}

fn dispatch(consumer: &Arc<PartitionConsumer>, handler: &Arc<SettlementConsumer>, message: OwnedMessage) {
    let topic = message.topic().to_string();
    let partition = message.partition();
    let Ok(mut workers) = consumer.context().workers.lock() else {
        tracing::error!(partition, "partition worker registry poisoned");
        return;
    };
    let worker = workers.entry(partition).or_insert_with(|| {
        spawn_partition_worker(&topic, partition, Arc::clone(consumer), Arc::clone(handler))
    });

    let pause = worker.backlog.push();
    if worker.tx.send(message).is_err() {
        tracing::error!(partition, "partition worker stopped");
        workers.remove(&partition);
        return;
    }
    if pause {
        tracing::warn!(partition, "partition worker behind, pausing partition");
        if let Err(err) = consumer.pause(&partition_list(&topic, partition)) {
            tracing::error!(partition, error = %err, "failed to pause partition");
        }
        if worker.backlog.settle() {
            resume(consumer, &topic, partition);
        }
    }
}

fn resume(consumer: &PartitionConsumer, topic: &str, partition: i32) {
    match consumer.resume(&partition_list(topic, partition)) {
        Ok(()) => tracing::info!(partition, "partition resumed"),
        Err(err) => tracing::error!(partition, error = %err, "failed to resume partition"),
    }
}

fn spawn_partition_worker(
    topic: &str,
    partition: i32,
    consumer: Arc<PartitionConsumer>,
    handler: Arc<SettlementConsumer>,
) -> PartitionWorker {
    let (tx, mut rx) = mpsc::unbounded_channel::<OwnedMessage>();
    let worker = PartitionWorker {
        tx,
        backlog: Arc::new(Backlog::default()),
        revoked: Arc::new(AtomicBool::new(false)),
    };
    let backlog = Arc::clone(&worker.backlog);
    let revoked = Arc::clone(&worker.revoked);
    let topic = topic.to_string();

    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if revoked.load(Ordering::SeqCst) {
                break;
            }
            let key = message
                .key()
                .map(|k| String::from_utf8_lossy(k).into_owned())
                .unwrap_or_default();
            let payload = message.payload().unwrap_or_default();
            loop {
                match handler.process(&key, payload).await {
                    Ok(delivery) => {
                        tracing::debug!(partition, offset = message.offset(), ?delivery, "processed");
                        break;
                    }
                    Err(err) if revoked.load(Ordering::SeqCst) => {
                        tracing::warn!(partition, offset = message.offset(), error = %err, "partition revoked while retrying");
                        return;
                    }
                    Err(err) => {
                        tracing::error!(partition, offset = message.offset(), error = %err, "processing failed, retrying");
                        tokio::time::sleep(handler.backoff()).await;
                    }
                }
            }
            if revoked.load(Ordering::SeqCst) {
                break;
            }
            if let Err(err) = commit(&consumer, &message) {
                tracing::error!(partition, error = %err, "failed to commit offset");
            }

            if backlog.pop() {
                resume(&consumer, &topic, partition);
            }
        }
        tracing::debug!(partition, "partition worker finished");
    });
    worker
}

fn commit(consumer: &PartitionConsumer, message: &OwnedMessage) -> rdkafka::error::KafkaResult<()> {
    let mut offsets = TopicPartitionList::new();
    offsets.add_partition_offset(
        message.topic(),
        message.partition(),
        Offset::Offset(message.offset() + 1),
    )?;
    consumer.commit(&offsets, CommitMode::Async)
}
