use async_trait::async_trait;
use reqwest::Method;
use uuid::Uuid;

use super::{SignedClient, read_data};
use crate::{
    dto::payments::{CreatePaymentRequest, PaymentData},
    error::{AppError, AppResult},
};

const SERVICE: &str = "payment-service";

/// Remote view of the payment service as seen from the order service.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates the hosted payment link for an order. Calling it again for the
    /// same `order_id` returns the payment created the first time.
    async fn create_payment_link(&self, request: &CreatePaymentRequest) -> AppResult<PaymentData>;

    async fn get_payment(&self, id: Uuid) -> AppResult<PaymentData>;
}

pub struct PaymentClient {
    client: SignedClient,
}

impl PaymentClient {
    pub fn new(client: SignedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentGateway for PaymentClient {
    async fn create_payment_link(&self, request: &CreatePaymentRequest) -> AppResult<PaymentData> {
        let response = self
            .client
            .request(Method::POST, "/payment")
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_data(SERVICE, "payment", response).await
    }

    async fn get_payment(&self, id: Uuid) -> AppResult<PaymentData> {
        let response = self
            .client
            .request(Method::GET, &format!("/payment/{id}"))
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        read_data(SERVICE, "payment", response).await
    }
}
