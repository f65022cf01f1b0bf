//! Order and payment services in one process, joined by the in-process bus.

use std::sync::Arc;

use field_booking::{
    clients::PaymentGateway,
    config::{OrderConfig, PaymentConfig},
    db::{create_orm_conn, run_migrations},
    events::{ChannelBus, EventPublisher},
    routes::{order_router, payment_router},
    server,
    services::payment_service::InProcessPayments,
};
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    server::init_tracing();

    let order_config = OrderConfig::from_env()?;
    let mut payment_config = PaymentConfig::from_env()?;
    payment_config.server.port = match std::env::var("PAYMENT_PORT") {
        Ok(port) => port.parse()?,
        Err(_) => order_config.server.port + 1,
    };

    let orm = create_orm_conn(&order_config.server.database_url).await?;
    run_migrations(&orm).await?;

    let (bus, settlements) = ChannelBus::new(1024);
    let (parking, parked) = ChannelBus::new(64);
    tokio::spawn(server::drain(parked, "settlement event parked"));

    let payment_state = server::payment_state(&payment_config, orm.clone(), Arc::new(bus))?;
    let payments: Arc<dyn PaymentGateway> = Arc::new(InProcessPayments::new(payment_state.clone()));
    let order_state = server::order_state(&order_config, orm, Some(payments))?;

    let parking: Arc<dyn EventPublisher> = Arc::new(parking);
    let consumer = server::settlement_consumer(order_state.clone(), parking, &order_config.broker);
    let topic = order_config.broker.topic.clone();
    tokio::spawn(async move { settlements.run(&topic, consumer).await });

    let order_app = server::with_http_layers(order_router().with_state(order_state));
    let payment_app = server::with_http_layers(
        payment_router()
            .nest_service("/invoices", ServeDir::new(&payment_config.invoice.dir))
            .with_state(payment_state),
    );

    tokio::try_join!(
        server::serve(order_app, &order_config.server.host, order_config.server.port),
        server::serve(payment_app, &payment_config.server.host, payment_config.server.port),
    )?;
    Ok(())
}
