use sea_orm::entity::prelude::*;

use crate::models::PaymentStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub uuid: Uuid,
    /// The gateway correlates callbacks by order, so this is the lookup key.
    #[sea_orm(unique)]
    pub order_id: Uuid,
    pub amount: i64,
    pub status: PaymentStatus,
    pub payment_link: String,
    pub invoice_link: Option<String>,
    pub transaction_id: Option<String>,
    pub va_number: Option<String>,
    pub bank: Option<String>,
    pub acquirer: Option<String>,
    pub description: Option<String>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub expired_at: DateTimeWithTimeZone,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::payment_histories::Entity")]
    PaymentHistories,
}

impl Related<super::payment_histories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentHistories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
