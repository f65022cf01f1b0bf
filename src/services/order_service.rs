use std::{collections::HashSet, sync::Arc, time::Duration};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    dto::{
        fields::FieldSchedule,
        orders::{CreateOrderRequest, OrderResponse, UserOrder, UserOrderList},
        payments::{CreatePaymentRequest, CustomerDetail, ItemDetail, PaymentData},
    },
    entity::orders::Model as OrderModel,
    error::{AppError, AppResult},
    events::{PaymentEventData, SettlementHandler},
    middleware::auth::AuthUser,
    models::{FieldStatus, OrderStatus},
    repositories::orders::{self, NewOrder, OrderTransition},
    response::{ApiResponse, Meta},
    state::OrderState,
};

fn payment_link_retry() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(2))
        .with_max_times(2)
        .with_jitter()
}

fn validate_schedule_ids(ids: &[Uuid]) -> AppResult<()> {
    if ids.is_empty() {
        return Err(AppError::BadRequest("fieldScheduleIds must not be empty".into()));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id) {
            return Err(AppError::BadRequest(format!("duplicate field schedule {id}")));
        }
    }
    Ok(())
}

fn order_response(order: &OrderModel, user_name: &str, payment_link: Option<String>) -> OrderResponse {
    OrderResponse {
        uuid: order.uuid,
        code: order.code.clone(),
        user_name: user_name.to_string(),
        amount: order.amount,
        status: order.status,
        order_date: order.date.with_timezone(&Utc),
        payment_link,
        created_at: order.created_at.with_timezone(&Utc),
        updated_at: order.updated_at.with_timezone(&Utc),
    }
}

/// Books the requested slots for `user`.
///
/// The order is committed first, then the payment link is requested and
/// attached. If either of the last two steps fails the order is expired so
/// its slots can never be booked through it.
pub async fn create_order(
    state: &OrderState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderResponse>> {
    let ids = payload.field_schedule_ids;
    validate_schedule_ids(&ids)?;

    let mut schedules: Vec<FieldSchedule> = Vec::with_capacity(ids.len());
    for id in &ids {
        let schedule = state.fields.get_schedule(*id, Some(&user.token)).await?;
        if schedule.status == FieldStatus::Booked {
            tracing::info!(schedule_id = %id, "field schedule already booked");
            return Err(AppError::AlreadyBooked);
        }
        schedules.push(schedule);
    }
    let amount: i64 = schedules.iter().map(FieldSchedule::price).sum();
    let now = Utc::now();

    let txn = state.orm.begin().await?;
    orders::lock_code_sequence(&txn).await?;
    let code = orders::next_order_code(&txn, now.date_naive()).await?;
    let order = orders::insert_order(
        &txn,
        NewOrder {
            code,
            user_id: user.user_id,
            amount,
            date: now,
        },
    )
    .await?;
    orders::insert_fields(&txn, order.id, &ids).await?;
    orders::append_history(&txn, order.id, OrderStatus::Pending).await?;
    txn.commit().await?;
    tracing::info!(order_id = %order.uuid, code = %order.code, amount, "order created");

    let description = format!(
        "Payment Rent {}",
        schedules.last().map(|s| s.name.as_str()).unwrap_or_default()
    );
    let request = CreatePaymentRequest {
        order_id: order.uuid,
        amount,
        expired_at: now + chrono::Duration::hours(1),
        description: description.clone(),
        customer_detail: CustomerDetail {
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
        },
        item_details: vec![ItemDetail {
            id: Uuid::new_v4(),
            name: description,
            amount,
            quantity: 1,
        }],
    };

    let payment = match link_payment(state, &order, &request).await {
        Ok(payment) => payment,
        Err(err) => {
            tracing::error!(order_id = %order.uuid, error = %err, "payment link failed, expiring order");
            expire_order(state, order.uuid).await;
            return Err(err);
        }
    };

    Ok(ApiResponse::success(
        "success",
        order_response(&order, &user.name, Some(payment.payment_link)),
        Some(Meta::empty()),
    ))
}

async fn link_payment(
    state: &OrderState,
    order: &OrderModel,
    request: &CreatePaymentRequest,
) -> AppResult<PaymentData> {
    let payment = (|| async { state.payments.create_payment_link(request).await })
        .retry(payment_link_retry())
        .when(|err| matches!(err, AppError::Upstream { .. }))
        .notify(|err: &AppError, after: Duration| {
            tracing::warn!(order_id = %order.uuid, error = %err, retry_in = ?after, "retrying payment link");
        })
        .await?;

    let txn = state.orm.begin().await?;
    if !orders::attach_payment(&txn, order.uuid, payment.uuid).await? {
        tracing::debug!(order_id = %order.uuid, "payment already attached");
    }
    txn.commit().await?;
    Ok(payment)
}

async fn expire_order(state: &OrderState, uuid: Uuid) {
    if let Err(err) = try_expire_order(state, uuid).await {
        tracing::error!(order_id = %uuid, error = %err, "failed to expire order");
    }
}

async fn try_expire_order(state: &OrderState, uuid: Uuid) -> AppResult<()> {
    let txn = state.orm.begin().await?;
    let applied = orders::transition(
        &txn,
        uuid,
        OrderTransition {
            status: OrderStatus::Expired,
            paid_at: None,
            payment_id: None,
        },
    )
    .await?;
    if applied {
        if let Some(order) = orders::find_by_uuid(&txn, uuid).await? {
            orders::append_history(&txn, order.id, OrderStatus::Expired).await?;
        }
    }
    txn.commit().await?;
    Ok(())
}

async fn payment_links(state: &OrderState, order: &OrderModel) -> AppResult<(Option<String>, Option<String>)> {
    match order.payment_id {
        Some(payment_id) => {
            let payment = state.payments.get_payment(payment_id).await?;
            Ok((Some(payment.payment_link), payment.invoice_link))
        }
        None => Ok((None, None)),
    }
}

pub async fn get_order(
    state: &OrderState,
    user: &AuthUser,
    uuid: Uuid,
) -> AppResult<ApiResponse<OrderResponse>> {
    let order = orders::find_by_uuid(&state.orm, uuid)
        .await?
        .filter(|order| order.user_id == user.user_id)
        .ok_or(AppError::NotFound("order"))?;
    let (payment_link, _) = payment_links(state, &order).await?;
    Ok(ApiResponse::success(
        "success",
        order_response(&order, &user.name, payment_link),
        Some(Meta::empty()),
    ))
}

pub async fn list_user_orders(
    state: &OrderState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UserOrderList>> {
    let rows = orders::find_by_user(&state.orm, user.user_id).await?;
    let mut items = Vec::with_capacity(rows.len());
    for order in rows {
        let (payment_link, invoice_link) = payment_links(state, &order).await?;
        items.push(UserOrder {
            uuid: order.uuid,
            code: order.code,
            amount: order.amount,
            status: order.status,
            order_date: order.date.with_timezone(&Utc),
            payment_link,
            invoice_link,
        });
    }
    let meta = Meta::total(items.len());
    Ok(ApiResponse::success("success", UserOrderList { items }, Some(meta)))
}

/// Applies a settlement event to its order. Redelivery of an event whose
/// status was already reached changes nothing.
pub async fn apply_settlement(state: &OrderState, data: &PaymentEventData) -> AppResult<()> {
    let target = data.status.order_status();
    let txn = state.orm.begin().await?;

    let applied = orders::transition(
        &txn,
        data.order_id,
        OrderTransition {
            status: target,
            paid_at: data.paid_at,
            payment_id: Some(data.payment_id),
        },
    )
    .await?;
    let order = orders::find_by_uuid(&txn, data.order_id)
        .await?
        .ok_or(AppError::NotFound("order"))?;

    if !applied {
        txn.commit().await?;
        tracing::debug!(
            order_id = %data.order_id,
            current = %order.status,
            target = %target,
            "settlement event already applied or stale"
        );
        return Ok(());
    }

    orders::append_history(&txn, order.id, target).await?;
    if target == OrderStatus::PaymentSuccess {
        let ids = orders::field_schedule_ids(&txn, order.id).await?;
        state.fields.mark_booked(&ids).await?;
    }
    txn.commit().await?;

    tracing::info!(order_id = %order.uuid, status = %target, "order updated from payment");
    Ok(())
}

/// Feeds settlement events into the order store.
pub struct OrderSettlement {
    state: Arc<OrderState>,
}

impl OrderSettlement {
    pub fn new(state: OrderState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }
}

#[async_trait]
impl SettlementHandler for OrderSettlement {
    async fn handle(&self, data: &PaymentEventData) -> AppResult<()> {
        apply_settlement(&self.state, data).await
    }
}
