use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::Utc;

use crate::{
    clients::signature::{self, SignatureError},
    error::AppError,
    state::ServiceKeys,
};

/// A request signed by a trusted peer service.
#[derive(Debug, Clone)]
pub struct SignedService {
    pub name: String,
}

fn header<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, SignatureError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or(SignatureError::MissingHeader(name))
}

fn check(parts: &Parts, keys: &ServiceKeys) -> Result<String, SignatureError> {
    let name = header(parts, signature::HEADER_SERVICE_NAME)?;
    let request_at = header(parts, signature::HEADER_REQUEST_AT)?;
    let api_key = header(parts, signature::HEADER_API_KEY)?;
    signature::verify(
        &keys.trusted,
        name,
        request_at,
        api_key,
        Utc::now().timestamp(),
        keys.max_age,
    )?;
    Ok(name.to_string())
}

impl<S> FromRequestParts<S> for SignedService
where
    S: Send + Sync,
    ServiceKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = ServiceKeys::from_ref(state);
        match check(parts, &keys) {
            Ok(name) => Ok(SignedService { name }),
            Err(err) => {
                tracing::warn!(uri = %parts.uri, error = %err, "rejected signed request");
                Err(AppError::Unauthorized)
            }
        }
    }
}
