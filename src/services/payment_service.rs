use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    clients::PaymentGateway,
    dto::payments::{CreatePaymentRequest, PaymentData, WebhookRequest},
    entity::payments::Model as PaymentModel,
    error::{AppError, AppResult},
    events::{BrokerError, PaymentEventData, SettlementEvent},
    models::{PaymentStatus, TransactionStatus},
    repositories::payments::{self, NewPayment, PaymentCallback},
    response::{ApiResponse, Meta},
    services::invoice::{self, Invoice},
    state::PaymentState,
};

fn validate(request: &CreatePaymentRequest, now: DateTime<Utc>) -> AppResult<()> {
    if request.amount <= 0 {
        return Err(AppError::BadRequest("amount must be positive".into()));
    }
    if request.item_details.is_empty() {
        return Err(AppError::BadRequest("itemDetails must not be empty".into()));
    }
    if request.expired_at <= now {
        return Err(AppError::BadRequest("expiredAt must be in the future".into()));
    }
    Ok(())
}

/// Creates the payment for an order, or returns the one created earlier for
/// the same order.
pub async fn create_payment(
    state: &PaymentState,
    request: CreatePaymentRequest,
) -> AppResult<ApiResponse<PaymentData>> {
    if let Some(existing) = payments::find_by_order_id(&state.orm, request.order_id).await? {
        tracing::info!(order_id = %request.order_id, "payment already exists for order");
        return Ok(ApiResponse::success("success", existing.into(), Some(Meta::empty())));
    }
    validate(&request, Utc::now())?;

    let link = state.links.create_transaction(&request).await?;

    let txn = state.orm.begin().await?;
    let inserted = payments::insert(
        &txn,
        NewPayment {
            order_id: request.order_id,
            amount: request.amount,
            payment_link: link.redirect_url,
            description: Some(request.description.clone()),
            expired_at: request.expired_at,
        },
    )
    .await;
    let payment = match inserted {
        Ok(payment) => {
            payments::append_history(&txn, payment.id, PaymentStatus::Initial).await?;
            txn.commit().await?;
            payment
        }
        Err(err) => {
            txn.rollback().await?;
            // A concurrent request for the same order won the insert.
            payments::find_by_order_id(&state.orm, request.order_id)
                .await?
                .ok_or(err)?
        }
    };

    tracing::info!(order_id = %payment.order_id, payment_id = %payment.uuid, "payment created");
    Ok(ApiResponse::success("success", payment.into(), Some(Meta::empty())))
}

pub async fn get_payment(state: &PaymentState, uuid: Uuid) -> AppResult<ApiResponse<PaymentData>> {
    let payment = payments::find_by_uuid(&state.orm, uuid)
        .await?
        .ok_or(AppError::NotFound("payment"))?;
    Ok(ApiResponse::success("success", payment.into(), Some(Meta::empty())))
}

/// Applies a gateway callback and publishes the resulting settlement event.
///
/// A callback repeating the stored status writes nothing but publishes
/// again. A callback that would move the status backwards is ignored.
pub async fn handle_webhook(state: &PaymentState, request: WebhookRequest) -> AppResult<()> {
    let status: TransactionStatus = request
        .transaction_status
        .parse()
        .map_err(|err: crate::models::UnknownTransactionStatus| AppError::BadRequest(err.to_string()))?;
    let target = status.payment_status();
    let now = Utc::now();
    let va = request.va_numbers.first();

    let txn = state.orm.begin().await?;
    let current = payments::find_by_order_id(&txn, request.order_id)
        .await?
        .ok_or(AppError::NotFound("payment"))?;

    let applied = payments::apply_callback(
        &txn,
        request.order_id,
        PaymentCallback {
            status: target,
            transaction_id: request.transaction_id.clone(),
            va_number: va.map(|v| v.va_number.clone()),
            bank: va.map(|v| v.bank.clone()),
            acquirer: request.acquirer.clone(),
            paid_at: (status == TransactionStatus::Settlement).then_some(now),
        },
    )
    .await?;

    let payment = if applied {
        let mut payment = payments::find_by_order_id(&txn, request.order_id)
            .await?
            .ok_or(AppError::NotFound("payment"))?;
        payments::append_history(&txn, payment.id, target).await?;
        if status == TransactionStatus::Settlement {
            let link = store_invoice(state, &payment, &request.payment_type, now).await?;
            payments::set_invoice_link(&txn, payment.id, &link).await?;
            payment.invoice_link = Some(link);
        }
        txn.commit().await?;
        tracing::info!(order_id = %payment.order_id, status = %target, "payment updated");
        payment
    } else if current.status == target {
        txn.commit().await?;
        tracing::info!(order_id = %current.order_id, status = %target, "repeated callback, publishing again");
        current
    } else {
        txn.commit().await?;
        tracing::warn!(
            order_id = %current.order_id,
            current = %current.status,
            reported = %target,
            "stale callback ignored"
        );
        return Ok(());
    };

    publish_settlement(state, &payment, status).await
}

async fn store_invoice(
    state: &PaymentState,
    payment: &PaymentModel,
    payment_type: &str,
    paid_at: DateTime<Utc>,
) -> AppResult<String> {
    let number = invoice::invoice_number(payment.id, paid_at.date_naive());
    let html = invoice::render(&Invoice {
        number: number.clone(),
        description: payment.description.clone().unwrap_or_default(),
        amount: payment.amount,
        payment_method: payment_type.to_string(),
        bank: payment.bank.clone().unwrap_or_default(),
        va_number: payment.va_number.clone().unwrap_or_default(),
        paid_at,
    });
    state
        .storage
        .upload(&invoice::file_name(&number), invoice::CONTENT_TYPE, html.into_bytes())
        .await
}

/// Publishes the settlement event for `payment`, keyed by its order.
pub async fn publish_settlement(
    state: &PaymentState,
    payment: &PaymentModel,
    status: TransactionStatus,
) -> AppResult<()> {
    let event = SettlementEvent::new(
        &state.sender,
        PaymentEventData {
            order_id: payment.order_id,
            payment_id: payment.uuid,
            status,
            paid_at: payment.paid_at.map(|at| at.with_timezone(&Utc)),
            expired_at: payment.expired_at.with_timezone(&Utc),
        },
    );
    let payload = serde_json::to_vec(&event).map_err(BrokerError::from)?;
    state
        .publisher
        .publish(&state.topic, &payment.order_id.to_string(), &payload)
        .await?;
    tracing::debug!(order_id = %payment.order_id, status = %status, topic = %state.topic, "settlement published");
    Ok(())
}

fn into_data(response: ApiResponse<PaymentData>) -> AppResult<PaymentData> {
    response
        .data
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("payment response without data")))
}

/// Payment service reached without HTTP, for a single-process deployment.
pub struct InProcessPayments {
    state: PaymentState,
}

impl InProcessPayments {
    pub fn new(state: PaymentState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl PaymentGateway for InProcessPayments {
    async fn create_payment_link(&self, request: &CreatePaymentRequest) -> AppResult<PaymentData> {
        into_data(create_payment(&self.state, request.clone()).await?)
    }

    async fn get_payment(&self, id: Uuid) -> AppResult<PaymentData> {
        into_data(get_payment(&self.state, id).await?)
    }
}
