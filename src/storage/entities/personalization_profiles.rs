use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "personalization_profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub owner_id: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub diagnosis: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub personality_traits: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub helpful_strategies: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub things_to_avoid: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub clinical_goals: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub tone: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub motivators: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub strategies: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub triggers_to_avoid: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub dos_and_donts: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
