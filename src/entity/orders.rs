use sea_orm::entity::prelude::*;

use crate::models::OrderStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub uuid: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub user_id: Uuid,
    pub amount: i64,
    pub date: DateTimeWithTimeZone,
    pub status: OrderStatus,
    pub is_paid: bool,
    pub payment_id: Option<Uuid>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_fields::Entity")]
    OrderFields,
    #[sea_orm(has_many = "super::order_histories::Entity")]
    OrderHistories,
}

impl Related<super::order_fields::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderFields.def()
    }
}

impl Related<super::order_histories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderHistories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
