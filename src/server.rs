//! Process wiring shared by the service binaries.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{HeaderName, Request, Response},
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    clients::{FieldClient, MidtransClient, PaymentClient, PaymentGateway, SignedClient},
    config::{BrokerConfig, BrokerKind, OrderConfig, PaymentConfig},
    db::OrmConn,
    events::{ChannelBus, ChannelReceiver, EventPublisher, SettlementConsumer},
    services::order_service::OrderSettlement,
    state::{AuthKeys, OrderState, PaymentState, ServiceKeys},
    storage::LocalBlobStorage,
};

const REQUEST_ID_HEADER: &str = "x-request-id";
const BUS_BUFFER: usize = 1024;

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,field_booking=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Request id, tracing, body limit and concurrency limit, outermost last.
pub fn with_http_layers(router: Router) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<_>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_request(|request: &Request<_>, _span: &tracing::Span| {
            tracing::info!(method = %request.method(), uri = %request.uri(), "request started");
        })
        .on_response(|response: &Response<_>, latency: Duration, _span: &tracing::Span| {
            tracing::info!(
                status = %response.status(),
                ms = %latency.as_millis(),
                "request finished"
            );
        });

    router
        .layer(trace_layer)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(ConcurrencyLimitLayer::new(100))
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    tracing::info!("listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

/// Order state talking to remote peers. `payments` overrides the HTTP
/// payment client when the payment service shares the process.
pub fn order_state(
    config: &OrderConfig,
    orm: OrmConn,
    payments: Option<Arc<dyn PaymentGateway>>,
) -> anyhow::Result<OrderState> {
    let name = &config.server.app_name;
    let fields = FieldClient::new(SignedClient::new(name, &config.field, config.http_timeout)?);
    let payments = match payments {
        Some(payments) => payments,
        None => {
            let peer = config
                .payment
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("PAYMENT_SERVICE_URL is not set"))?;
            Arc::new(PaymentClient::new(SignedClient::new(name, peer, config.http_timeout)?))
        }
    };
    Ok(OrderState {
        orm,
        auth: AuthKeys::from_secret(&config.jwt_secret),
        fields: Arc::new(fields),
        payments,
    })
}

pub fn payment_state(
    config: &PaymentConfig,
    orm: OrmConn,
    publisher: Arc<dyn EventPublisher>,
) -> anyhow::Result<PaymentState> {
    Ok(PaymentState {
        orm,
        services: ServiceKeys {
            trusted: Arc::new(config.server.trusted_services.clone()),
            max_age: config.server.signature_max_age,
        },
        links: Arc::new(MidtransClient::new(config.midtrans.clone(), config.http_timeout)?),
        storage: Arc::new(LocalBlobStorage::new(&config.invoice)),
        publisher,
        topic: config.broker.topic.clone(),
        sender: config.server.app_name.clone(),
    })
}

/// Publisher for the configured broker. With the in-process bus and no
/// consumer in this process, published events are only logged.
pub fn publisher(config: &BrokerConfig) -> anyhow::Result<Arc<dyn EventPublisher>> {
    match config.kind {
        BrokerKind::Kafka => kafka_publisher(config),
        BrokerKind::Channel => {
            let (bus, receiver) = ChannelBus::new(BUS_BUFFER);
            tokio::spawn(drain(receiver, "no consumer in this process, event discarded"));
            Ok(Arc::new(bus))
        }
    }
}

#[cfg(feature = "kafka")]
fn kafka_publisher(config: &BrokerConfig) -> anyhow::Result<Arc<dyn EventPublisher>> {
    Ok(Arc::new(crate::events::kafka::KafkaPublisher::new(config)?))
}

#[cfg(not(feature = "kafka"))]
fn kafka_publisher(_config: &BrokerConfig) -> anyhow::Result<Arc<dyn EventPublisher>> {
    anyhow::bail!("BROKER=kafka requires building with the kafka feature")
}

/// Logs and discards every message of a bus nobody consumes.
pub async fn drain(mut receiver: ChannelReceiver, reason: &'static str) {
    while let Some(message) = receiver.recv().await {
        tracing::warn!(
            topic = %message.topic,
            key = %message.key,
            payload = %String::from_utf8_lossy(&message.payload),
            "{reason}"
        );
    }
}

pub fn settlement_consumer(
    state: OrderState,
    parking: Arc<dyn EventPublisher>,
    config: &BrokerConfig,
) -> SettlementConsumer {
    SettlementConsumer::new(Arc::new(OrderSettlement::new(state)), parking, config)
}

/// Starts consuming settlement events from Kafka in the background.
#[cfg(feature = "kafka")]
pub fn spawn_kafka_consumer(state: OrderState, config: &BrokerConfig) -> anyhow::Result<()> {
    let parking: Arc<dyn EventPublisher> =
        Arc::new(crate::events::kafka::KafkaPublisher::new(config)?);
    let consumer = Arc::new(settlement_consumer(state, parking, config));
    let config = config.clone();
    tokio::spawn(async move {
        if let Err(err) = crate::events::kafka::run_consumer(&config, consumer).await {
            tracing::error!(error = %err, "settlement consumer stopped");
        }
    });
    Ok(())
}

#[cfg(not(feature = "kafka"))]
pub fn spawn_kafka_consumer(_state: OrderState, _config: &BrokerConfig) -> anyhow::Result<()> {
    anyhow::bail!("BROKER=kafka requires building with the kafka feature")
}
