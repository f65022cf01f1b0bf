use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::FieldStatus;

/// A bookable slot as reported by the field service.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchedule {
    pub uuid: Uuid,
    pub name: String,
    pub price_per_hour: f64,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: FieldStatus,
}

impl FieldSchedule {
    /// Price in whole currency units.
    pub fn price(&self) -> i64 {
        self.price_per_hour.round() as i64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldScheduleStatusRequest {
    pub field_schedule_ids: Vec<Uuid>,
}
