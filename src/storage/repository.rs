use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{prelude::*, Condition, QueryOrder, Set};
use uuid::Uuid;

use crate::models::internal::{
    ExerciseRecommendation, Message, NewMessage, PersonalizationProfile, PlanType, QuotaState,
};
use crate::storage::entities::{
    anonymization_settings, chat_messages, exercise_recommendations, message_quotas,
    personalization_profiles,
};

/// Limit given to owners that have no quota row yet.
pub const DEFAULT_DAILY_LIMIT: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DbError(#[from] sea_orm::DbErr),
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

// ============================================
// TRAIT DEFINITIONS
// ============================================

/// Owner-scoped chat state: messages, exercise recommendations, and the
/// read-mostly profile and anonymization records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn insert_message(&self, message: NewMessage) -> Result<Message, RepositoryError>;

    /// All messages of `owner_id`, oldest first.
    async fn messages_for_owner(&self, owner_id: Uuid) -> Result<Vec<Message>, RepositoryError>;

    async fn count_messages(&self, owner_id: Uuid) -> Result<u64, RepositoryError>;

    async fn insert_exercise(
        &self,
        owner_id: Uuid,
        exercise_text: String,
        recommended_at: DateTime<Utc>,
    ) -> Result<ExerciseRecommendation, RepositoryError>;

    /// Most recently recommended exercise that is still unconfirmed.
    async fn latest_pending_exercise(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<ExerciseRecommendation>, RepositoryError>;

    async fn close_exercise(
        &self,
        id: Uuid,
        completed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<ExerciseRecommendation, RepositoryError>;

    async fn exercises_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<ExerciseRecommendation>, RepositoryError>;

    async fn find_profile(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<PersonalizationProfile>, RepositoryError>;

    async fn upsert_profile(&self, profile: PersonalizationProfile) -> Result<(), RepositoryError>;

    /// `None` when the owner never stored a preference.
    async fn anonymization_enabled(&self, owner_id: Uuid) -> Result<Option<bool>, RepositoryError>;

    async fn set_anonymization(&self, owner_id: Uuid, enabled: bool) -> Result<(), RepositoryError>;
}

/// Daily message allowance storage. Rollover of the counter belongs to an
/// external scheduler that calls [`QuotaStore::reset_daily_usage`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Current quota row, created with the default free plan when missing.
    async fn quota_state(&self, owner_id: Uuid) -> Result<QuotaState, RepositoryError>;

    /// Atomically increments usage if the owner is under their limit.
    /// Returns `false` without writing when the limit is already reached.
    async fn try_record_message(&self, owner_id: Uuid) -> Result<bool, RepositoryError>;

    async fn reset_daily_usage(&self, owner_id: Uuid) -> Result<(), RepositoryError>;

    async fn set_plan(
        &self,
        owner_id: Uuid,
        plan_type: PlanType,
        daily_limit: i32,
    ) -> Result<(), RepositoryError>;
}

// ============================================
// IMPLEMENTATION STRUCT
// ============================================
#[derive(Clone)]
pub struct SeaOrmChatRepository {
    db: DatabaseConnection,
    default_daily_limit: i32,
}

impl SeaOrmChatRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            default_daily_limit: DEFAULT_DAILY_LIMIT,
        }
    }

    pub fn with_default_daily_limit(mut self, limit: i32) -> Self {
        self.default_daily_limit = limit;
        self
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn ensure_quota_row(&self, owner_id: Uuid) -> Result<(), RepositoryError> {
        let row = message_quotas::ActiveModel {
            owner_id: Set(owner_id.to_string()),
            plan_type: Set(PlanType::Free.as_str().to_string()),
            daily_limit: Set(self.default_daily_limit),
            messages_used_today: Set(0),
            updated_at: Set(Utc::now()),
        };

        let inserted = message_quotas::Entity::insert(row)
            .on_conflict(
                OnConflict::column(message_quotas::Column::OwnerId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if inserted > 0 {
            tracing::debug!("Created default quota for owner {}", owner_id);
        }
        Ok(())
    }
}

// ============================================
// TRAIT IMPLEMENTATIONS
// ============================================
#[async_trait]
impl ChatRepository for SeaOrmChatRepository {
    async fn insert_message(&self, message: NewMessage) -> Result<Message, RepositoryError> {
        let id = Uuid::new_v4();

        let model = chat_messages::ActiveModel {
            id: Set(id.to_string()),
            owner_id: Set(message.owner_id.to_string()),
            role: Set(message.role.as_str().to_string()),
            content: Set(message.content),
            created_at: Set(message.created_at),
        }
        .insert(&self.db)
        .await?;

        tracing::debug!("Stored {} message {}", model.role, id);
        Message::try_from(model)
    }

    async fn messages_for_owner(&self, owner_id: Uuid) -> Result<Vec<Message>, RepositoryError> {
        chat_messages::Entity::find()
            .filter(chat_messages::Column::OwnerId.eq(owner_id.to_string()))
            .order_by_asc(chat_messages::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Message::try_from)
            .collect()
    }

    async fn count_messages(&self, owner_id: Uuid) -> Result<u64, RepositoryError> {
        let count = chat_messages::Entity::find()
            .filter(chat_messages::Column::OwnerId.eq(owner_id.to_string()))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn insert_exercise(
        &self,
        owner_id: Uuid,
        exercise_text: String,
        recommended_at: DateTime<Utc>,
    ) -> Result<ExerciseRecommendation, RepositoryError> {
        let model = exercise_recommendations::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            owner_id: Set(owner_id.to_string()),
            exercise_text: Set(exercise_text),
            recommended_at: Set(recommended_at),
            completed: Set(None),
            completed_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        ExerciseRecommendation::try_from(model)
    }

    async fn latest_pending_exercise(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<ExerciseRecommendation>, RepositoryError> {
        exercise_recommendations::Entity::find()
            .filter(exercise_recommendations::Column::OwnerId.eq(owner_id.to_string()))
            .filter(exercise_recommendations::Column::Completed.is_null())
            .order_by_desc(exercise_recommendations::Column::RecommendedAt)
            .one(&self.db)
            .await?
            .map(ExerciseRecommendation::try_from)
            .transpose()
    }

    async fn close_exercise(
        &self,
        id: Uuid,
        completed: bool,
        completed_at: DateTime<Utc>,
    ) -> Result<ExerciseRecommendation, RepositoryError> {
        let model = exercise_recommendations::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Exercise {} not found", id)))?;

        let mut active_model: exercise_recommendations::ActiveModel = model.into();
        active_model.completed = Set(Some(completed));
        active_model.completed_at = Set(Some(completed_at));

        let updated = active_model.update(&self.db).await?;
        ExerciseRecommendation::try_from(updated)
    }

    async fn exercises_for_owner(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<ExerciseRecommendation>, RepositoryError> {
        exercise_recommendations::Entity::find()
            .filter(exercise_recommendations::Column::OwnerId.eq(owner_id.to_string()))
            .order_by_asc(exercise_recommendations::Column::RecommendedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ExerciseRecommendation::try_from)
            .collect()
    }

    async fn find_profile(
        &self,
        owner_id: Uuid,
    ) -> Result<Option<PersonalizationProfile>, RepositoryError> {
        personalization_profiles::Entity::find_by_id(owner_id.to_string())
            .one(&self.db)
            .await?
            .map(PersonalizationProfile::try_from)
            .transpose()
    }

    async fn upsert_profile(&self, profile: PersonalizationProfile) -> Result<(), RepositoryError> {
        use personalization_profiles::Column;

        let row = personalization_profiles::ActiveModel {
            owner_id: Set(profile.owner_id.to_string()),
            diagnosis: Set(profile.diagnosis),
            personality_traits: Set(profile.personality_traits),
            helpful_strategies: Set(profile.helpful_strategies),
            things_to_avoid: Set(profile.things_to_avoid),
            clinical_goals: Set(profile.clinical_goals),
            tone: Set(profile.tone),
            motivators: Set(profile.motivators),
            strategies: Set(profile.strategies),
            triggers_to_avoid: Set(profile.triggers_to_avoid),
            dos_and_donts: Set(profile.dos_and_donts),
            updated_at: Set(Utc::now()),
        };

        personalization_profiles::Entity::insert(row)
            .on_conflict(
                OnConflict::column(Column::OwnerId)
                    .update_columns([
                        Column::Diagnosis,
                        Column::PersonalityTraits,
                        Column::HelpfulStrategies,
                        Column::ThingsToAvoid,
                        Column::ClinicalGoals,
                        Column::Tone,
                        Column::Motivators,
                        Column::Strategies,
                        Column::TriggersToAvoid,
                        Column::DosAndDonts,
                        Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn anonymization_enabled(&self, owner_id: Uuid) -> Result<Option<bool>, RepositoryError> {
        let setting = anonymization_settings::Entity::find_by_id(owner_id.to_string())
            .one(&self.db)
            .await?;
        Ok(setting.map(|s| s.enabled))
    }

    async fn set_anonymization(&self, owner_id: Uuid, enabled: bool) -> Result<(), RepositoryError> {
        let row = anonymization_settings::ActiveModel {
            owner_id: Set(owner_id.to_string()),
            enabled: Set(enabled),
            updated_at: Set(Utc::now()),
        };

        anonymization_settings::Entity::insert(row)
            .on_conflict(
                OnConflict::column(anonymization_settings::Column::OwnerId)
                    .update_columns([
                        anonymization_settings::Column::Enabled,
                        anonymization_settings::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl QuotaStore for SeaOrmChatRepository {
    async fn quota_state(&self, owner_id: Uuid) -> Result<QuotaState, RepositoryError> {
        self.ensure_quota_row(owner_id).await?;

        let model = message_quotas::Entity::find_by_id(owner_id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("Quota for {} not found", owner_id)))?;

        QuotaState::try_from(model)
    }

    async fn try_record_message(&self, owner_id: Uuid) -> Result<bool, RepositoryError> {
        use message_quotas::Column;

        self.ensure_quota_row(owner_id).await?;

        // Single conditional UPDATE so concurrent senders cannot both pass
        // the limit check before either increment lands.
        let result = message_quotas::Entity::update_many()
            .col_expr(
                Column::MessagesUsedToday,
                Expr::col(Column::MessagesUsedToday).add(1),
            )
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::OwnerId.eq(owner_id.to_string()))
            .filter(
                Condition::any()
                    .add(Column::DailyLimit.lt(0))
                    .add(Expr::col(Column::MessagesUsedToday).lt(Expr::col(Column::DailyLimit))),
            )
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn reset_daily_usage(&self, owner_id: Uuid) -> Result<(), RepositoryError> {
        use message_quotas::Column;

        message_quotas::Entity::update_many()
            .col_expr(Column::MessagesUsedToday, Expr::value(0))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::OwnerId.eq(owner_id.to_string()))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn set_plan(
        &self,
        owner_id: Uuid,
        plan_type: PlanType,
        daily_limit: i32,
    ) -> Result<(), RepositoryError> {
        use message_quotas::Column;

        let row = message_quotas::ActiveModel {
            owner_id: Set(owner_id.to_string()),
            plan_type: Set(plan_type.as_str().to_string()),
            daily_limit: Set(daily_limit),
            messages_used_today: Set(0),
            updated_at: Set(Utc::now()),
        };

        message_quotas::Entity::insert(row)
            .on_conflict(
                OnConflict::column(Column::OwnerId)
                    .update_columns([Column::PlanType, Column::DailyLimit, Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

// ============================================
// Conversions
// ============================================

fn parse_uuid(value: &str, column: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value)
        .map_err(|e| RepositoryError::Corrupt(format!("{} '{}': {}", column, value, e)))
}

impl TryFrom<chat_messages::Model> for Message {
    type Error = RepositoryError;

    fn try_from(model: chat_messages::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "chat_messages.id")?,
            owner_id: parse_uuid(&model.owner_id, "chat_messages.owner_id")?,
            role: model.role.parse().map_err(RepositoryError::Corrupt)?,
            content: model.content,
            created_at: model.created_at,
        })
    }
}

impl TryFrom<exercise_recommendations::Model> for ExerciseRecommendation {
    type Error = RepositoryError;

    fn try_from(model: exercise_recommendations::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "exercise_recommendations.id")?,
            owner_id: parse_uuid(&model.owner_id, "exercise_recommendations.owner_id")?,
            exercise_text: model.exercise_text,
            recommended_at: model.recommended_at,
            completed: model.completed,
            completed_at: model.completed_at,
        })
    }
}

impl TryFrom<personalization_profiles::Model> for PersonalizationProfile {
    type Error = RepositoryError;

    fn try_from(model: personalization_profiles::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            owner_id: parse_uuid(&model.owner_id, "personalization_profiles.owner_id")?,
            diagnosis: model.diagnosis,
            personality_traits: model.personality_traits,
            helpful_strategies: model.helpful_strategies,
            things_to_avoid: model.things_to_avoid,
            clinical_goals: model.clinical_goals,
            tone: model.tone,
            motivators: model.motivators,
            strategies: model.strategies,
            triggers_to_avoid: model.triggers_to_avoid,
            dos_and_donts: model.dos_and_donts,
        })
    }
}

impl TryFrom<message_quotas::Model> for QuotaState {
    type Error = RepositoryError;

    fn try_from(model: message_quotas::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            owner_id: parse_uuid(&model.owner_id, "message_quotas.owner_id")?,
            plan_type: model.plan_type.parse().map_err(RepositoryError::Corrupt)?,
            daily_limit: model.daily_limit,
            messages_used_today: model.messages_used_today,
        })
    }
}
