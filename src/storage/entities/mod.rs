pub mod anonymization_settings;
pub mod chat_messages;
pub mod exercise_recommendations;
pub mod message_quotas;
pub mod personalization_profiles;
