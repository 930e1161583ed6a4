pub mod internal;

pub use internal::{
    ExerciseRecommendation, HistoryEntry, Message, NewMessage, OwnerContext,
    PersonalizationProfile, PlanType, QuotaState, QuotaUsage, Role,
};
