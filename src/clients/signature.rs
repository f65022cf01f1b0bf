//! Shared-secret request signing for calls between services.
//!
//! The caller sends its name, the unix time of the request and
//! `hex(sha256("{name}:{secret}:{unix}"))`; the receiver looks the secret up
//! by name and recomputes the digest.

use std::{collections::HashMap, time::Duration};

use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const HEADER_SERVICE_NAME: &str = "x-service-name";
pub const HEADER_REQUEST_AT: &str = "x-request-at";
pub const HEADER_API_KEY: &str = "x-api-key";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("unknown service {0}")]
    UnknownService(String),
    #[error("invalid request timestamp")]
    InvalidTimestamp,
    #[error("request signature expired")]
    Expired,
    #[error("signature mismatch")]
    Mismatch,
}

pub fn sign(service_name: &str, secret: &str, unix_time: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{service_name}:{secret}:{unix_time}").as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks an inbound signature against the secret registered for `service_name`.
pub fn verify(
    trusted: &HashMap<String, String>,
    service_name: &str,
    request_at: &str,
    api_key: &str,
    now: i64,
    max_age: Duration,
) -> Result<(), SignatureError> {
    let secret = trusted
        .get(service_name)
        .ok_or_else(|| SignatureError::UnknownService(service_name.to_string()))?;
    let unix_time: i64 = request_at
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    if now.abs_diff(unix_time) > max_age.as_secs() {
        return Err(SignatureError::Expired);
    }

    let expected = sign(service_name, secret, unix_time);
    if !constant_time_eq(expected.as_bytes(), api_key.as_bytes()) {
        return Err(SignatureError::Mismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trusted() -> HashMap<String, String> {
        HashMap::from([("order-service".to_string(), "s3cret".to_string())])
    }

    #[test]
    fn signature_is_hex_sha256_of_name_secret_and_time() {
        let key = sign("order-service", "s3cret", 1_700_000_000);
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, sign("order-service", "s3cret", 1_700_000_000));
        assert_ne!(key, sign("order-service", "s3cret", 1_700_000_001));
    }

    #[test]
    fn verify_accepts_fresh_matching_signature() {
        let now = 1_700_000_000;
        let key = sign("order-service", "s3cret", now);
        let result = verify(&trusted(), "order-service", &now.to_string(), &key, now + 5, Duration::from_secs(300));
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn verify_rejects_wrong_secret_unknown_service_and_stale_time() {
        let now = 1_700_000_000;
        let max_age = Duration::from_secs(300);
        let forged = sign("order-service", "guess", now);
        assert_eq!(
            verify(&trusted(), "order-service", &now.to_string(), &forged, now, max_age),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify(&trusted(), "field-service", &now.to_string(), &forged, now, max_age),
            Err(SignatureError::UnknownService("field-service".into()))
        );
        let old = sign("order-service", "s3cret", now - 3600);
        assert_eq!(
            verify(&trusted(), "order-service", &(now - 3600).to_string(), &old, now, max_age),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify(&trusted(), "order-service", "yesterday", &old, now, max_age),
            Err(SignatureError::InvalidTimestamp)
        );
    }
}
