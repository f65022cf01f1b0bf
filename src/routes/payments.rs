use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::payments::{CreatePaymentRequest, PaymentData, WebhookRequest},
    error::{AppError, AppResult},
    middleware::{json::ValidJson, service_auth::SignedService},
    response::{ApiResponse, Meta},
    services::payment_service,
    state::PaymentState,
};

pub fn router() -> Router<PaymentState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/webhook", post(webhook))
        .route("/{uuid}", get(get_payment))
}

#[utoipa::path(
    post,
    path = "/api/v1/payment",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Payment created or already existing", body = ApiResponse<PaymentData>),
        (status = 401, description = "Missing or invalid service signature"),
    ),
    security(("service_signature" = [])),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<PaymentState>,
    caller: SignedService,
    ValidJson(payload): ValidJson<CreatePaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentData>>> {
    tracing::debug!(caller = %caller.name, order_id = %payload.order_id, "create payment");
    let resp = payment_service::create_payment(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/payment/{uuid}",
    params(("uuid" = Uuid, Path, description = "Payment uuid")),
    responses(
        (status = 200, body = ApiResponse<PaymentData>),
        (status = 404, description = "Payment not found"),
    ),
    security(("service_signature" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<PaymentState>,
    _caller: SignedService,
    Path(uuid): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PaymentData>>> {
    let resp = payment_service::get_payment(&state, uuid).await?;
    Ok(Json(resp))
}

/// Callback from the payment gateway. Unknown orders are answered with 400
/// so the gateway stops retrying them.
#[utoipa::path(
    post,
    path = "/api/v1/payment/webhook",
    request_body = WebhookRequest,
    responses(
        (status = 200, description = "Callback applied"),
        (status = 400, description = "Unknown payment, transaction status or unreadable body"),
    ),
    security(()),
    tag = "Payments"
)]
pub async fn webhook(
    State(state): State<PaymentState>,
    ValidJson(payload): ValidJson<WebhookRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    payment_service::handle_webhook(&state, payload)
        .await
        .map_err(|err| match err {
            AppError::NotFound(entity) => AppError::BadRequest(format!("{entity} not found")),
            other => other,
        })?;
    Ok(Json(ApiResponse {
        message: "success".into(),
        data: None,
        meta: Some(Meta::empty()),
    }))
}
