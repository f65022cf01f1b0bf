use std::time::Duration;

use chrono::Utc;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::{
    config::PeerConfig,
    error::{AppError, AppResult},
    response::ApiResponse,
};

pub mod field;
pub mod midtrans;
pub mod payment;
pub mod signature;

pub use field::{FieldClient, FieldGateway};
pub use midtrans::{MidtransClient, PaymentLink, PaymentLinkProvider};
pub use payment::{PaymentClient, PaymentGateway};

/// HTTP client for a peer service. Every request it builds carries the
/// caller's signature headers and inherits the configured timeout.
#[derive(Clone, Debug)]
pub struct SignedClient {
    http: reqwest::Client,
    base_url: String,
    service_name: String,
    secret: String,
}

impl SignedClient {
    pub fn new(service_name: &str, peer: &PeerConfig, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: peer.base_url.trim_end_matches('/').to_string(),
            service_name: service_name.to_string(),
            secret: peer.signature_key.clone(),
        })
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let now = Utc::now().timestamp();
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header(signature::HEADER_SERVICE_NAME, &self.service_name)
            .header(signature::HEADER_REQUEST_AT, now.to_string())
            .header(
                signature::HEADER_API_KEY,
                signature::sign(&self.service_name, &self.secret, now),
            )
    }
}

/// Reads a peer response, mapping 404 to `NotFound(entity)` and any other
/// failure to `Upstream`.
pub(crate) async fn read_data<T: DeserializeOwned>(
    service: &'static str,
    entity: &'static str,
    response: Response,
) -> AppResult<T> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| AppError::upstream(service, e))?;

    if status == StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(entity));
    }
    if !status.is_success() {
        let message = serde_json::from_slice::<ApiResponse<serde_json::Value>>(&body)
            .map(|r| r.message)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).chars().take(200).collect());
        return Err(AppError::upstream(service, format!("{status}: {message}")));
    }

    let parsed: ApiResponse<T> =
        serde_json::from_slice(&body).map_err(|e| AppError::upstream(service, e))?;
    parsed
        .data
        .ok_or_else(|| AppError::upstream(service, "response without data"))
}

/// Like [`read_data`] for calls whose body is irrelevant.
pub(crate) async fn ensure_success(service: &'static str, response: Response) -> AppResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::upstream(
        service,
        format!("{status}: {}", body.chars().take(200).collect::<String>()),
    ))
}
