use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderResponse, UserOrderList},
    error::AppResult,
    middleware::{auth::AuthUser, json::ValidJson},
    response::ApiResponse,
    services::order_service,
    state::OrderState,
};

pub fn router() -> Router<OrderState> {
    Router::new()
        .route("/", post(create_order))
        .route("/user", get(list_user_orders))
        .route("/{uuid}", get(get_order))
}

#[utoipa::path(
    post,
    path = "/api/v1/order",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid field schedule ids"),
        (status = 409, description = "A field schedule is already booked"),
        (status = 502, description = "Field or payment service unavailable"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<OrderState>,
    user: AuthUser,
    ValidJson(payload): ValidJson<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderResponse>>> {
    let resp = order_service::create_order(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/order/user",
    responses((status = 200, body = ApiResponse<UserOrderList>)),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_user_orders(
    State(state): State<OrderState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserOrderList>>> {
    let resp = order_service::list_user_orders(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/v1/order/{uuid}",
    params(("uuid" = Uuid, Path, description = "Order uuid")),
    responses(
        (status = 200, body = ApiResponse<OrderResponse>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<OrderState>,
    user: AuthUser,
    Path(uuid): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderResponse>>> {
    let resp = order_service::get_order(&state, &user, uuid).await?;
    Ok(Json(resp))
}
