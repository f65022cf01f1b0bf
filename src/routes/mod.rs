use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};

use crate::{
    response::{ApiResponse, Meta},
    state::{OrderState, PaymentState},
};

pub mod doc;
pub mod health;
pub mod orders;
pub mod payments;

/// Routes served by the order service, state still unbound.
pub fn order_router() -> Router<OrderState> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/order", orders::router())
        .merge(doc::order_docs())
        .fallback(not_found)
}

/// Routes served by the payment service, state still unbound.
pub fn payment_router() -> Router<PaymentState> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/payment", payments::router())
        .merge(doc::payment_docs())
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
