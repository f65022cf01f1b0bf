use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, Statement,
    sea_query::{Expr, Func, SimpleExpr},
};
use uuid::Uuid;

use crate::{
    entity::{
        OrderFields, OrderHistories, Orders,
        order_fields::{ActiveModel as OrderFieldActive, Column as OrderFieldCol},
        order_histories::ActiveModel as OrderHistoryActive,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
    },
    models::OrderStatus,
};

/// Key of the transaction-scoped advisory lock serializing code generation.
const ORDER_CODE_LOCK: i64 = 0x4f52_4443;

pub struct NewOrder {
    pub code: String,
    pub user_id: Uuid,
    pub amount: i64,
    pub date: DateTime<Utc>,
}

/// Fields written together with a status move.
pub struct OrderTransition {
    pub status: OrderStatus,
    pub paid_at: Option<DateTime<Utc>>,
    pub payment_id: Option<Uuid>,
}

/// Serializes order code generation until the surrounding transaction ends.
/// Only Postgres has advisory locks; elsewhere the unique index on `code`
/// is the only guard.
pub async fn lock_code_sequence<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    if conn.get_database_backend() == DbBackend::Postgres {
        conn.execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            "SELECT pg_advisory_xact_lock($1)",
            [ORDER_CODE_LOCK.into()],
        ))
        .await?;
    }
    Ok(())
}

/// `ORD-{seq:05}-{YYYYMMDD}` where seq follows the code of the newest order.
/// The very first code pads with spaces instead of zeros.
pub async fn next_order_code<C: ConnectionTrait>(conn: &C, today: NaiveDate) -> Result<String, DbErr> {
    let day = today.format("%Y%m%d");
    let latest = Orders::find()
        .order_by_desc(OrderCol::Id)
        .one(conn)
        .await?;

    Ok(match latest {
        Some(order) => {
            let seq = order
                .code
                .get(4..9)
                .and_then(|raw| raw.parse::<u32>().ok())
                .unwrap_or(0);
            format!("ORD-{:05}-{}", seq + 1, day)
        }
        None => format!("ORD-{:5}-{}", 1, day),
    })
}

pub async fn insert_order<C: ConnectionTrait>(conn: &C, order: NewOrder) -> Result<OrderModel, DbErr> {
    let now = Utc::now();
    OrderActive {
        uuid: Set(Uuid::new_v4()),
        code: Set(order.code),
        user_id: Set(order.user_id),
        amount: Set(order.amount),
        date: Set(order.date.into()),
        status: Set(OrderStatus::Pending),
        is_paid: Set(false),
        payment_id: Set(None),
        paid_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

pub async fn insert_fields<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    field_schedule_ids: &[Uuid],
) -> Result<(), DbErr> {
    let now = Utc::now();
    let rows = field_schedule_ids.iter().map(|id| OrderFieldActive {
        order_id: Set(order_id),
        field_schedule_id: Set(*id),
        created_at: Set(now.into()),
        ..Default::default()
    });
    OrderFields::insert_many(rows).exec(conn).await?;
    Ok(())
}

pub async fn append_history<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    status: OrderStatus,
) -> Result<(), DbErr> {
    OrderHistoryActive {
        order_id: Set(order_id),
        status: Set(status.as_str().to_string()),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

pub async fn find_by_uuid<C: ConnectionTrait>(conn: &C, uuid: Uuid) -> Result<Option<OrderModel>, DbErr> {
    Orders::find().filter(OrderCol::Uuid.eq(uuid)).one(conn).await
}

pub async fn find_by_user<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<Vec<OrderModel>, DbErr> {
    Orders::find()
        .filter(OrderCol::UserId.eq(user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(conn)
        .await
}

pub async fn field_schedule_ids<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<Vec<Uuid>, DbErr> {
    Ok(OrderFields::find()
        .filter(OrderFieldCol::OrderId.eq(order_id))
        .order_by_asc(OrderFieldCol::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|row| row.field_schedule_id)
        .collect())
}

/// Records the payment created for an order. Returns false when a payment
/// id was already attached.
pub async fn attach_payment<C: ConnectionTrait>(
    conn: &C,
    uuid: Uuid,
    payment_id: Uuid,
) -> Result<bool, DbErr> {
    let result = Orders::update_many()
        .set(OrderActive {
            payment_id: Set(Some(payment_id)),
            updated_at: Set(Utc::now().into()),
            ..Default::default()
        })
        .filter(OrderCol::Uuid.eq(uuid))
        .filter(OrderCol::PaymentId.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Moves an order to `transition.status` if it currently sits in one of the
/// allowed predecessor statuses. Returns whether a row changed.
pub async fn transition<C: ConnectionTrait>(
    conn: &C,
    uuid: Uuid,
    transition: OrderTransition,
) -> Result<bool, DbErr> {
    let mut changes = OrderActive {
        status: Set(transition.status),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };
    if transition.status == OrderStatus::PaymentSuccess {
        changes.is_paid = Set(true);
    }
    if let Some(paid_at) = transition.paid_at {
        changes.paid_at = Set(Some(paid_at.into()));
    }

    let mut update = Orders::update_many().set(changes);
    if let Some(payment_id) = transition.payment_id {
        let keep_existing: SimpleExpr =
            Func::coalesce([Expr::col(OrderCol::PaymentId).into(), Expr::value(payment_id)]).into();
        update = update.col_expr(OrderCol::PaymentId, keep_existing);
    }

    let result = update
        .filter(OrderCol::Uuid.eq(uuid))
        .filter(OrderCol::Status.is_in(transition.status.predecessors().iter().copied()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

pub async fn history<C: ConnectionTrait>(conn: &C, order_id: i32) -> Result<Vec<String>, DbErr> {
    use crate::entity::order_histories::Column as HistoryCol;

    Ok(OrderHistories::find()
        .filter(HistoryCol::OrderId.eq(order_id))
        .order_by_asc(HistoryCol::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(|row| row.status)
        .collect())
}
