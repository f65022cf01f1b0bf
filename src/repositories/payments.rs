use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    entity::{
        PaymentHistories, Payments,
        payment_histories::{ActiveModel as PaymentHistoryActive, Column as HistoryCol},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Model as PaymentModel},
    },
    models::PaymentStatus,
};

pub struct NewPayment {
    pub order_id: Uuid,
    pub amount: i64,
    pub payment_link: String,
    pub description: Option<String>,
    pub expired_at: DateTime<Utc>,
}

/// Fields reported by a gateway callback.
pub struct PaymentCallback {
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub va_number: Option<String>,
    pub bank: Option<String>,
    pub acquirer: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

pub async fn find_by_order_id<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Option<PaymentModel>, DbErr> {
    Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .one(conn)
        .await
}

pub async fn find_by_uuid<C: ConnectionTrait>(conn: &C, uuid: Uuid) -> Result<Option<PaymentModel>, DbErr> {
    Payments::find().filter(PaymentCol::Uuid.eq(uuid)).one(conn).await
}

pub async fn insert<C: ConnectionTrait>(conn: &C, payment: NewPayment) -> Result<PaymentModel, DbErr> {
    let now = Utc::now();
    PaymentActive {
        uuid: Set(Uuid::new_v4()),
        order_id: Set(payment.order_id),
        amount: Set(payment.amount),
        status: Set(PaymentStatus::Initial),
        payment_link: Set(payment.payment_link),
        description: Set(payment.description),
        expired_at: Set(payment.expired_at.into()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

pub async fn append_history<C: ConnectionTrait>(
    conn: &C,
    payment_id: i32,
    status: PaymentStatus,
) -> Result<(), DbErr> {
    PaymentHistoryActive {
        payment_id: Set(payment_id),
        status: Set(status.as_str().to_string()),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Applies a gateway callback when the stored status may move to
/// `callback.status`. Returns whether a row changed.
pub async fn apply_callback<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    callback: PaymentCallback,
) -> Result<bool, DbErr> {
    let mut changes = PaymentActive {
        status: Set(callback.status),
        transaction_id: Set(Some(callback.transaction_id)),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };
    if callback.va_number.is_some() {
        changes.va_number = Set(callback.va_number);
    }
    if callback.bank.is_some() {
        changes.bank = Set(callback.bank);
    }
    if callback.acquirer.is_some() {
        changes.acquirer = Set(callback.acquirer);
    }
    if let Some(paid_at) = callback.paid_at {
        changes.paid_at = Set(Some(paid_at.into()));
    }

    let result = Payments::update_many()
        .set(changes)
        .filter(PaymentCol::OrderId.eq(order_id))
        .filter(PaymentCol::Status.is_in(callback.status.predecessors().iter().copied()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn set_invoice_link<C: ConnectionTrait>(conn: &C, id: i32, link: &str) -> Result<(), DbErr> {
    Payments::update_many()
        .col_expr(PaymentCol::InvoiceLink, Expr::value(link))
        .filter(PaymentCol::Id.eq(id))
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn history<C: ConnectionTrait>(conn: &C, payment_id: i32) -> Result<Vec<String>, DbErr> {
    Ok(PaymentHistories::find()
        .filter(HistoryCol::PaymentId.eq(payment_id))
        .order_by_asc(HistoryCol::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|row| row.status)
        .collect())
}
