use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::TransactionStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    pub sender: String,
    pub sending_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBody<T> {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage<T> {
    pub event: EventName,
    pub metadata: EventMetadata,
    pub body: EventBody<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEventData {
    pub order_id: Uuid,
    pub payment_id: Uuid,
    pub status: TransactionStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub expired_at: DateTime<Utc>,
}

pub type SettlementEvent = EventMessage<PaymentEventData>;

impl SettlementEvent {
    pub fn new(sender: &str, data: PaymentEventData) -> Self {
        Self {
            event: EventName {
                name: data.status.event_name(),
            },
            metadata: EventMetadata {
                sender: sender.to_string(),
                sending_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
            body: EventBody {
                kind: "JSON".to_string(),
                data,
            },
        }
    }
}
