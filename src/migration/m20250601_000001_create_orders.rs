use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::Uuid).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Orders::Code).string_len(32).not_null().unique_key())
                    .col(ColumnDef::new(Orders::UserId).uuid().not_null())
                    .col(ColumnDef::new(Orders::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Orders::Date).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Orders::Status).integer().not_null())
                    .col(ColumnDef::new(Orders::IsPaid).boolean().not_null())
                    .col(ColumnDef::new(Orders::PaymentId).uuid().null())
                    .col(ColumnDef::new(Orders::PaidAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Orders::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_user_id")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderFields::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderFields::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderFields::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderFields::FieldScheduleId).uuid().not_null())
                    .col(ColumnDef::new(OrderFields::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_fields_order_id")
                            .from(OrderFields::Table, OrderFields::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_order_fields_order_id")
                    .table(OrderFields::Table)
                    .col(OrderFields::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderHistories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderHistories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderHistories::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderHistories::Status).string_len(32).not_null())
                    .col(
                        ColumnDef::new(OrderHistories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_histories_order_id")
                            .from(OrderHistories::Table, OrderHistories::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderHistories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OrderFields::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    Uuid,
    Code,
    UserId,
    Amount,
    Date,
    Status,
    IsPaid,
    PaymentId,
    PaidAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OrderFields {
    Table,
    Id,
    OrderId,
    FieldScheduleId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OrderHistories {
    Table,
    Id,
    OrderId,
    Status,
    CreatedAt,
}
