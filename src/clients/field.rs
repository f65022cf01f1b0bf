use async_trait::async_trait;
use reqwest::Method;
use uuid::Uuid;

use super::{SignedClient, ensure_success, read_data};
use crate::{
    dto::fields::{FieldSchedule, UpdateFieldScheduleStatusRequest},
    error::{AppError, AppResult},
};

const SERVICE: &str = "field-service";

/// Remote view of the field reservation service.
#[async_trait]
pub trait FieldGateway: Send + Sync {
    /// Current price and status of one schedule slot. `token` is the
    /// caller's bearer token, forwarded as-is.
    async fn get_schedule(&self, id: Uuid, token: Option<&str>) -> AppResult<FieldSchedule>;

    /// Marks every slot in `ids` as booked. Slots that are already booked
    /// are left as they are.
    async fn mark_booked(&self, ids: &[Uuid]) -> AppResult<()>;
}

pub struct FieldClient {
    client: SignedClient,
}

impl FieldClient {
    pub fn new(client: SignedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FieldGateway for FieldClient {
    async fn get_schedule(&self, id: Uuid, token: Option<&str>) -> AppResult<FieldSchedule> {
        let mut request = self
            .client
            .request(Method::GET, &format!("/field/schedule/{id}"));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| {
            tracing::warn!(schedule_id = %id, error = %e, "field schedule lookup failed");
            AppError::upstream(SERVICE, e)
        })?;
        read_data(SERVICE, "field schedule", response).await
    }

    async fn mark_booked(&self, ids: &[Uuid]) -> AppResult<()> {
        let body = UpdateFieldScheduleStatusRequest {
            field_schedule_ids: ids.to_vec(),
        };
        let response = self
            .client
            .request(Method::PATCH, "/field/schedule/status")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        ensure_success(SERVICE, response).await
    }
}
