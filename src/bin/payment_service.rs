use field_booking::{config::PaymentConfig, db::create_orm_conn, routes::payment_router, server};
use tower_http::services::ServeDir;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    server::init_tracing();

    let config = PaymentConfig::from_env()?;
    let orm = create_orm_conn(&config.server.database_url).await?;
    let publisher = server::publisher(&config.broker)?;
    let state = server::payment_state(&config, orm, publisher)?;

    let router = payment_router()
        .nest_service("/invoices", ServeDir::new(&config.invoice.dir))
        .with_state(state);
    let app = server::with_http_layers(router);
    server::serve(app, &config.server.host, config.server.port).await
}
