use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("field already booked")]
    AlreadyBooked,

    #[error("{0}")]
    Conflict(String),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("{service} call failed: {reason}")]
    Upstream {
        service: &'static str,
        reason: String,
    },

    #[error("Database error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Broker error")]
    Broker(#[from] crate::events::BrokerError),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn upstream(service: &'static str, reason: impl ToString) -> Self {
        AppError::Upstream {
            service,
            reason: reason.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyBooked | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::OrmError(_) | AppError::Broker(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whitelist of errors whose message may be shown to a client verbatim.
    /// Anything not listed here is masked.
    pub fn is_exposable(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::AlreadyBooked
                | AppError::Conflict(_)
                | AppError::BadRequest(_)
                | AppError::Unauthorized
        )
    }

    pub fn client_message(&self) -> String {
        if self.is_exposable() {
            self.to_string()
        } else {
            INTERNAL_ERROR_MESSAGE.to_string()
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if !self.is_exposable() {
            tracing::error!(error = ?self, "request failed");
        }
        let message = self.client_message();

        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_masked() {
        let err = AppError::OrmError(sea_orm::DbErr::Custom("relation \"orders\" does not exist".into()));
        assert!(!err.is_exposable());
        assert_eq!(err.client_message(), INTERNAL_ERROR_MESSAGE);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_errors_are_masked_but_flagged_as_bad_gateway() {
        let err = AppError::upstream("payment-service", "connection refused");
        assert_eq!(err.client_message(), INTERNAL_ERROR_MESSAGE);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn domain_errors_are_echoed() {
        assert_eq!(AppError::AlreadyBooked.client_message(), "field already booked");
        assert_eq!(AppError::NotFound("payment").client_message(), "payment not found");
        assert_eq!(AppError::AlreadyBooked.status_code(), StatusCode::CONFLICT);
    }
}
