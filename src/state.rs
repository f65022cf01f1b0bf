use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::extract::FromRef;
use jsonwebtoken::DecodingKey;

use crate::{
    clients::{FieldGateway, PaymentGateway, PaymentLinkProvider},
    db::OrmConn,
    events::EventPublisher,
    storage::BlobStorage,
};

/// Key used to verify user bearer tokens.
#[derive(Clone)]
pub struct AuthKeys {
    pub decoding: DecodingKey,
}

impl AuthKeys {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Secrets of services allowed to call signed endpoints.
#[derive(Clone)]
pub struct ServiceKeys {
    pub trusted: Arc<HashMap<String, String>>,
    pub max_age: Duration,
}

#[derive(Clone)]
pub struct OrderState {
    pub orm: OrmConn,
    pub auth: AuthKeys,
    pub fields: Arc<dyn FieldGateway>,
    pub payments: Arc<dyn PaymentGateway>,
}

impl FromRef<OrderState> for AuthKeys {
    fn from_ref(state: &OrderState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<OrderState> for OrmConn {
    fn from_ref(state: &OrderState) -> Self {
        state.orm.clone()
    }
}

#[derive(Clone)]
pub struct PaymentState {
    pub orm: OrmConn,
    pub services: ServiceKeys,
    pub links: Arc<dyn PaymentLinkProvider>,
    pub storage: Arc<dyn BlobStorage>,
    pub publisher: Arc<dyn EventPublisher>,
    /// Topic receiving settlement events.
    pub topic: String,
    /// `metadata.sender` of published events.
    pub sender: String,
}

impl FromRef<PaymentState> for ServiceKeys {
    fn from_ref(state: &PaymentState) -> Self {
        state.services.clone()
    }
}

impl FromRef<PaymentState> for OrmConn {
    fn from_ref(state: &PaymentState) -> Self {
        state.orm.clone()
    }
}
