use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Payments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Payments::Uuid).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Payments::OrderId).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Payments::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Payments::Status).integer().not_null())
                    .col(ColumnDef::new(Payments::PaymentLink).text().not_null())
                    .col(ColumnDef::new(Payments::InvoiceLink).text().null())
                    .col(ColumnDef::new(Payments::TransactionId).string_len(100).null())
                    .col(ColumnDef::new(Payments::VaNumber).string_len(50).null())
                    .col(ColumnDef::new(Payments::Bank).string_len(50).null())
                    .col(ColumnDef::new(Payments::Acquirer).string_len(50).null())
                    .col(ColumnDef::new(Payments::Description).text().null())
                    .col(ColumnDef::new(Payments::PaidAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Payments::ExpiredAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Payments::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Payments::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentHistories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentHistories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentHistories::PaymentId).integer().not_null())
                    .col(ColumnDef::new(PaymentHistories::Status).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PaymentHistories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_histories_payment_id")
                            .from(PaymentHistories::Table, PaymentHistories::PaymentId)
                            .to(Payments::Table, Payments::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentHistories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    Id,
    Uuid,
    OrderId,
    Amount,
    Status,
    PaymentLink,
    InvoiceLink,
    TransactionId,
    VaNumber,
    Bank,
    Acquirer,
    Description,
    PaidAt,
    ExpiredAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PaymentHistories {
    Table,
    Id,
    PaymentId,
    Status,
    CreatedAt,
}
