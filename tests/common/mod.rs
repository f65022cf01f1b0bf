#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use field_booking::{
    clients::{FieldGateway, PaymentGateway, PaymentLink, PaymentLinkProvider},
    config::{BrokerConfig, BrokerKind},
    db::{OrmConn, run_migrations},
    dto::{
        fields::FieldSchedule,
        payments::{CreatePaymentRequest, PaymentData},
    },
    error::{AppError, AppResult},
    events::{ChannelBus, ChannelReceiver},
    middleware::auth::{AuthUser, Claims},
    models::FieldStatus,
    services::payment_service::InProcessPayments,
    state::{AuthKeys, OrderState, PaymentState, ServiceKeys},
    storage::BlobStorage,
};
use sea_orm::{ConnectOptions, Database};
use uuid::Uuid;

pub const TOPIC: &str = "payment-service-callback";
pub const JWT_SECRET: &str = "test-secret";
pub const ORDER_SERVICE_SECRET: &str = "order-secret";

/// Fresh in-memory database with every migration applied. One connection
/// only, since each in-memory connection is a separate database.
pub async fn database() -> OrmConn {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let conn = Database::connect(options).await.expect("sqlite connection");
    run_migrations(&conn).await.expect("migrations");
    conn
}

pub fn user() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        name: "budi".into(),
        email: "budi@example.com".into(),
        phone: "081234567890".into(),
        role: "customer".into(),
        token: "user-token".into(),
    }
}

/// Bearer token for `user`, signed the way the user service signs them.
pub fn bearer(user: &AuthUser, secret: &str) -> String {
    let claims = Claims {
        sub: user.user_id.to_string(),
        name: user.name.clone(),
        email: user.email.clone(),
        phone: user.phone.clone(),
        role: user.role.clone(),
        exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token");
    format!("Bearer {token}")
}

pub fn broker_config(max_retry: usize) -> BrokerConfig {
    BrokerConfig {
        kind: BrokerKind::Channel,
        brokers: String::new(),
        topic: TOPIC.into(),
        group_id: "order-service".into(),
        max_retry,
        backoff: Duration::from_millis(1),
    }
}

pub fn schedule(name: &str, price: f64, status: FieldStatus) -> FieldSchedule {
    FieldSchedule {
        uuid: Uuid::new_v4(),
        name: name.into(),
        price_per_hour: price,
        date: "2025-08-17".into(),
        start_time: "08:00:00".into(),
        end_time: "09:00:00".into(),
        status,
    }
}

#[derive(Default)]
pub struct FakeFields {
    schedules: Mutex<HashMap<Uuid, FieldSchedule>>,
    pub booked: Mutex<Vec<Vec<Uuid>>>,
    pub fail_booking: AtomicBool,
}

impl FakeFields {
    pub fn with(schedules: Vec<FieldSchedule>) -> Arc<Self> {
        let fields = Self::default();
        fields
            .schedules
            .lock()
            .unwrap()
            .extend(schedules.into_iter().map(|s| (s.uuid, s)));
        Arc::new(fields)
    }

    pub fn booked_calls(&self) -> Vec<Vec<Uuid>> {
        self.booked.lock().unwrap().clone()
    }
}

#[async_trait]
impl FieldGateway for FakeFields {
    async fn get_schedule(&self, id: Uuid, _token: Option<&str>) -> AppResult<FieldSchedule> {
        self.schedules
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound("field schedule"))
    }

    async fn mark_booked(&self, ids: &[Uuid]) -> AppResult<()> {
        if self.fail_booking.load(Ordering::SeqCst) {
            return Err(AppError::upstream("field-service", "unavailable"));
        }
        self.booked.lock().unwrap().push(ids.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeLinks {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PaymentLinkProvider for FakeLinks {
    async fn create_transaction(&self, request: &CreatePaymentRequest) -> AppResult<PaymentLink> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentLink {
            token: format!("token-{}", request.order_id),
            redirect_url: format!("https://pay.test/{}", request.order_id),
        })
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn file(&self, name: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStorage for MemoryStorage {
    async fn upload(&self, file_name: &str, _content_type: &str, bytes: Vec<u8>) -> AppResult<String> {
        self.files.lock().unwrap().insert(file_name.to_string(), bytes);
        Ok(format!("https://files.test/{file_name}"))
    }
}

/// Payment gateway that always fails with an upstream error.
#[derive(Default)]
pub struct DownPayments {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for DownPayments {
    async fn create_payment_link(&self, _request: &CreatePaymentRequest) -> AppResult<PaymentData> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AppError::upstream("payment-service", "connection refused"))
    }

    async fn get_payment(&self, _id: Uuid) -> AppResult<PaymentData> {
        Err(AppError::upstream("payment-service", "connection refused"))
    }
}

/// Creates the payment but loses the first response, as a timeout after
/// the payment service already committed would.
pub struct LossyPayments {
    pub inner: InProcessPayments,
    pub calls: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for LossyPayments {
    async fn create_payment_link(&self, request: &CreatePaymentRequest) -> AppResult<PaymentData> {
        let payment = self.inner.create_payment_link(request).await?;
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(AppError::upstream("payment-service", "timed out"));
        }
        Ok(payment)
    }

    async fn get_payment(&self, id: Uuid) -> AppResult<PaymentData> {
        self.inner.get_payment(id).await
    }
}

pub struct PaymentHarness {
    pub state: PaymentState,
    pub events: ChannelReceiver,
    pub links: Arc<FakeLinks>,
    pub storage: Arc<MemoryStorage>,
}

pub async fn payment_harness() -> PaymentHarness {
    let (bus, events) = ChannelBus::new(64);
    let links = Arc::new(FakeLinks::default());
    let storage = Arc::new(MemoryStorage::default());
    let state = PaymentState {
        orm: database().await,
        services: ServiceKeys {
            trusted: Arc::new(HashMap::from([(
                "order-service".to_string(),
                ORDER_SERVICE_SECRET.to_string(),
            )])),
            max_age: Duration::from_secs(300),
        },
        links: links.clone(),
        storage: storage.clone(),
        publisher: Arc::new(bus),
        topic: TOPIC.into(),
        sender: "payment-service".into(),
    };
    PaymentHarness {
        state,
        events,
        links,
        storage,
    }
}

pub async fn order_state(fields: Arc<FakeFields>, payments: Arc<dyn PaymentGateway>) -> OrderState {
    OrderState {
        orm: database().await,
        auth: AuthKeys::from_secret(JWT_SECRET),
        fields,
        payments,
    }
}
