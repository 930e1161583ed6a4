use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MessageQuotas::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MessageQuotas::OwnerId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MessageQuotas::PlanType)
                            .string_len(20)
                            .not_null()
                            .default("free"),
                    )
                    .col(ColumnDef::new(MessageQuotas::DailyLimit).integer().not_null())
                    .col(
                        ColumnDef::new(MessageQuotas::MessagesUsedToday)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(MessageQuotas::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AnonymizationSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AnonymizationSettings::OwnerId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AnonymizationSettings::Enabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AnonymizationSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AnonymizationSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(MessageQuotas::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MessageQuotas {
    Table,
    OwnerId,
    PlanType,
    DailyLimit,
    MessagesUsedToday,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AnonymizationSettings {
    Table,
    OwnerId,
    Enabled,
    UpdatedAt,
}
