use field_booking::{
    config::{BrokerKind, OrderConfig},
    db::create_orm_conn,
    routes::order_router,
    server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    server::init_tracing();

    let config = OrderConfig::from_env()?;
    let orm = create_orm_conn(&config.server.database_url).await?;
    let state = server::order_state(&config, orm, None)?;

    match config.broker.kind {
        BrokerKind::Kafka => server::spawn_kafka_consumer(state.clone(), &config.broker)?,
        BrokerKind::Channel => tracing::warn!(
            "in-process bus selected, settlement events reach this service only in the standalone binary"
        ),
    }

    let app = server::with_http_layers(order_router().with_state(state));
    server::serve(app, &config.server.host, config.server.port).await
}
