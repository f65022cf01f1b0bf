use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::OrderStatus;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub field_schedule_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub uuid: Uuid,
    pub code: String,
    pub user_name: String,
    pub amount: i64,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub payment_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserOrder {
    pub uuid: Uuid,
    pub code: String,
    pub amount: i64,
    pub status: OrderStatus,
    pub order_date: DateTime<Utc>,
    pub payment_link: Option<String>,
    pub invoice_link: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserOrderList {
    pub items: Vec<UserOrder>,
}
