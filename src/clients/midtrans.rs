//! Hosted payment links through the Midtrans Snap API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    config::MidtransConfig,
    dto::payments::CreatePaymentRequest,
    error::{AppError, AppResult},
};

const SERVICE: &str = "midtrans";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLink {
    pub token: String,
    pub redirect_url: String,
}

/// Issues hosted payment links. The payment service owns exactly one.
#[async_trait]
pub trait PaymentLinkProvider: Send + Sync {
    async fn create_transaction(&self, request: &CreatePaymentRequest) -> AppResult<PaymentLink>;
}

pub struct MidtransClient {
    http: reqwest::Client,
    config: MidtransConfig,
}

impl MidtransClient {
    pub fn new(config: MidtransConfig, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, config })
    }
}

#[derive(Debug, Serialize)]
struct SnapRequest<'a> {
    transaction_details: TransactionDetails,
    customer_details: CustomerDetails<'a>,
    item_details: Vec<SnapItem<'a>>,
    expiry: Expiry,
}

#[derive(Debug, Serialize)]
struct TransactionDetails {
    order_id: String,
    gross_amount: i64,
}

#[derive(Debug, Serialize)]
struct CustomerDetails<'a> {
    first_name: &'a str,
    email: &'a str,
    phone: &'a str,
}

#[derive(Debug, Serialize)]
struct SnapItem<'a> {
    id: String,
    name: &'a str,
    price: i64,
    quantity: i32,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct Expiry {
    unit: &'static str,
    duration: i64,
}

#[derive(Debug, Deserialize)]
struct SnapResponse {
    token: String,
    redirect_url: String,
}

#[derive(Debug, Deserialize)]
struct SnapError {
    #[serde(default)]
    error_messages: Vec<String>,
}

/// Snap takes expiry as a duration: whole hours when at least an hour is
/// left (also beyond a day), whole minutes otherwise.
pub(crate) fn expiry_for(expired_at: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<Expiry> {
    let left = expired_at - now;
    if left <= chrono::Duration::zero() {
        return Err(AppError::BadRequest("expiredAt must be in the future".into()));
    }
    if left.num_hours() >= 1 {
        Ok(Expiry {
            unit: "hour",
            duration: left.num_hours(),
        })
    } else {
        Ok(Expiry {
            unit: "minute",
            duration: left.num_minutes().max(1),
        })
    }
}

#[async_trait]
impl PaymentLinkProvider for MidtransClient {
    async fn create_transaction(&self, request: &CreatePaymentRequest) -> AppResult<PaymentLink> {
        let expiry = expiry_for(request.expired_at, Utc::now())?;
        let body = SnapRequest {
            transaction_details: TransactionDetails {
                order_id: request.order_id.to_string(),
                gross_amount: request.amount,
            },
            customer_details: CustomerDetails {
                first_name: &request.customer_detail.name,
                email: &request.customer_detail.email,
                phone: &request.customer_detail.phone,
            },
            item_details: request
                .item_details
                .iter()
                .map(|item| SnapItem {
                    id: item.id.to_string(),
                    name: &item.name,
                    price: item.amount,
                    quantity: item.quantity,
                })
                .collect(),
            expiry,
        };

        let response = self
            .http
            .post(format!(
                "{}/snap/v1/transactions",
                self.config.base_url.trim_end_matches('/')
            ))
            .basic_auth(&self.config.server_key, Some(""))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(order_id = %request.order_id, error = %e, "midtrans create transaction failed");
                AppError::upstream(SERVICE, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<SnapError>()
                .await
                .map(|e| e.error_messages.join("; "))
                .unwrap_or_default();
            tracing::error!(order_id = %request.order_id, %status, %reason, "midtrans rejected transaction");
            return Err(AppError::upstream(SERVICE, format!("{status}: {reason}")));
        }

        let snap: SnapResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e))?;
        Ok(PaymentLink {
            token: snap.token,
            redirect_url: snap.redirect_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_uses_hours_when_an_hour_or_more_is_left() {
        let now = Utc::now();
        let expiry = expiry_for(now + chrono::Duration::minutes(90), now).unwrap();
        assert_eq!(expiry, Expiry { unit: "hour", duration: 1 });
    }

    #[test]
    fn expiry_stays_in_hours_beyond_a_day() {
        let now = Utc::now();
        let expiry = expiry_for(now + chrono::Duration::hours(49), now).unwrap();
        assert_eq!(expiry, Expiry { unit: "hour", duration: 49 });
    }

    #[test]
    fn expiry_uses_minutes_below_an_hour() {
        let now = Utc::now();
        let expiry = expiry_for(now + chrono::Duration::minutes(45), now).unwrap();
        assert_eq!(expiry, Expiry { unit: "minute", duration: 45 });
    }

    #[test]
    fn expiry_in_the_past_is_rejected() {
        let now = Utc::now();
        assert!(matches!(
            expiry_for(now - chrono::Duration::seconds(1), now),
            Err(AppError::BadRequest(_))
        ));
    }
}
