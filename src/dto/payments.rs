use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{entity::payments::Model as PaymentModel, models::PaymentStatus};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemDetail {
    pub id: Uuid,
    pub name: String,
    pub amount: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    pub amount: i64,
    pub expired_at: DateTime<Utc>,
    pub description: String,
    pub customer_detail: CustomerDetail,
    pub item_details: Vec<ItemDetail>,
}

/// Payment snapshot returned by the payment service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub uuid: Uuid,
    pub order_id: Uuid,
    pub amount: i64,
    pub status: PaymentStatus,
    pub payment_link: String,
    pub invoice_link: Option<String>,
    pub transaction_id: Option<String>,
    pub va_number: Option<String>,
    pub bank: Option<String>,
    pub acquirer: Option<String>,
    pub description: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PaymentModel> for PaymentData {
    fn from(model: PaymentModel) -> Self {
        Self {
            uuid: model.uuid,
            order_id: model.order_id,
            amount: model.amount,
            status: model.status,
            payment_link: model.payment_link,
            invoice_link: model.invoice_link,
            transaction_id: model.transaction_id,
            va_number: model.va_number,
            bank: model.bank,
            acquirer: model.acquirer,
            description: model.description,
            paid_at: model.paid_at.map(|dt| dt.with_timezone(&Utc)),
            expired_at: model.expired_at.with_timezone(&Utc),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaNumber {
    pub bank: String,
    pub va_number: String,
}

/// Callback body sent by the payment gateway.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub order_id: Uuid,
    pub transaction_id: String,
    /// `pending`, `settlement` or `expire`.
    pub transaction_status: String,
    pub payment_type: String,
    #[serde(default)]
    pub va_numbers: Vec<VaNumber>,
    pub acquirer: Option<String>,
}
