use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChatMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChatMessages::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChatMessages::OwnerId).string_len(36).not_null())
                    .col(ColumnDef::new(ChatMessages::Role).string_len(20).not_null())
                    .col(ColumnDef::new(ChatMessages::Content).text().not_null())
                    .col(
                        ColumnDef::new(ChatMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_chat_messages_owner_created")
                    .table(ChatMessages::Table)
                    .col(ChatMessages::OwnerId)
                    .col(ChatMessages::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExerciseRecommendations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExerciseRecommendations::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExerciseRecommendations::OwnerId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExerciseRecommendations::ExerciseText)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExerciseRecommendations::RecommendedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExerciseRecommendations::Completed).boolean().null())
                    .col(
                        ColumnDef::new(ExerciseRecommendations::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_exercise_recommendations_owner_recommended")
                    .table(ExerciseRecommendations::Table)
                    .col(ExerciseRecommendations::OwnerId)
                    .col(ExerciseRecommendations::RecommendedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PersonalizationProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PersonalizationProfiles::OwnerId)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PersonalizationProfiles::Diagnosis).text().null())
                    .col(
                        ColumnDef::new(PersonalizationProfiles::PersonalityTraits)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PersonalizationProfiles::HelpfulStrategies)
                            .text()
                            .null(),
                    )
                    .col(ColumnDef::new(PersonalizationProfiles::ThingsToAvoid).text().null())
                    .col(ColumnDef::new(PersonalizationProfiles::ClinicalGoals).text().null())
                    .col(ColumnDef::new(PersonalizationProfiles::Tone).text().null())
                    .col(ColumnDef::new(PersonalizationProfiles::Motivators).text().null())
                    .col(ColumnDef::new(PersonalizationProfiles::Strategies).text().null())
                    .col(ColumnDef::new(PersonalizationProfiles::TriggersToAvoid).text().null())
                    .col(ColumnDef::new(PersonalizationProfiles::DosAndDonts).text().null())
                    .col(
                        ColumnDef::new(PersonalizationProfiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PersonalizationProfiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExerciseRecommendations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ChatMessages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ChatMessages {
    Table,
    Id,
    OwnerId,
    Role,
    Content,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ExerciseRecommendations {
    Table,
    Id,
    OwnerId,
    ExerciseText,
    RecommendedAt,
    Completed,
    CompletedAt,
}

#[derive(DeriveIden)]
enum PersonalizationProfiles {
    Table,
    OwnerId,
    Diagnosis,
    PersonalityTraits,
    HelpfulStrategies,
    ThingsToAvoid,
    ClinicalGoals,
    Tone,
    Motivators,
    Strategies,
    TriggersToAvoid,
    DosAndDonts,
    UpdatedAt,
}
