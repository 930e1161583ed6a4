use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(format!("unknown message role '{}'", other)),
        }
    }
}

/// Who is looking at a conversation, and therefore whose conversation it is.
///
/// Every read, write and quota check of one operation derives its owner from
/// [`OwnerContext::owner_id`], so the identity rule lives in exactly one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OwnerContext {
    /// A patient in their own companion chat.
    Patient { patient_id: Uuid },
    /// A clinician looking at one of their patients' conversations.
    ClinicianViewingPatient { clinician_id: Uuid, patient_id: Uuid },
    /// A clinician in their private training conversation.
    ClinicianTraining { clinician_id: Uuid },
}

impl OwnerContext {
    /// The identity that owns the conversation: the clinician for a training
    /// chat, the patient in every other case.
    pub fn owner_id(&self) -> Uuid {
        match self {
            OwnerContext::Patient { patient_id } => *patient_id,
            OwnerContext::ClinicianViewingPatient { patient_id, .. } => *patient_id,
            OwnerContext::ClinicianTraining { clinician_id } => *clinician_id,
        }
    }

    /// The authenticated account issuing the call.
    pub fn caller_id(&self) -> Uuid {
        match self {
            OwnerContext::Patient { patient_id } => *patient_id,
            OwnerContext::ClinicianViewingPatient { clinician_id, .. } => *clinician_id,
            OwnerContext::ClinicianTraining { clinician_id } => *clinician_id,
        }
    }

    pub fn is_training(&self) -> bool {
        matches!(self, OwnerContext::ClinicianTraining { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub owner_id: Uuid,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Compact `{ role, content }` projection handed to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Clinician-authored preferences for one patient. Modern fields take
/// precedence; legacy fields fill in field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalizationProfile {
    pub owner_id: Uuid,
    pub diagnosis: Option<String>,
    pub personality_traits: Option<String>,
    pub helpful_strategies: Option<String>,
    pub things_to_avoid: Option<String>,
    pub clinical_goals: Option<String>,
    // legacy shape
    pub tone: Option<String>,
    pub motivators: Option<String>,
    pub strategies: Option<String>,
    pub triggers_to_avoid: Option<String>,
    pub dos_and_donts: Option<String>,
}

fn filled(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn first_filled<'a>(preferred: &'a Option<String>, legacy: &'a Option<String>) -> Option<&'a str> {
    filled(preferred).or_else(|| filled(legacy))
}

impl PersonalizationProfile {
    pub fn empty(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            ..Default::default()
        }
    }

    pub fn diagnosis(&self) -> Option<&str> {
        filled(&self.diagnosis)
    }

    pub fn personality(&self) -> Option<&str> {
        first_filled(&self.personality_traits, &self.tone)
    }

    pub fn strategies(&self) -> Option<&str> {
        first_filled(&self.helpful_strategies, &self.strategies)
    }

    pub fn avoid(&self) -> Option<&str> {
        first_filled(&self.things_to_avoid, &self.triggers_to_avoid)
    }

    pub fn goals(&self) -> Option<&str> {
        first_filled(&self.clinical_goals, &self.motivators)
    }

    pub fn dos_and_donts(&self) -> Option<&str> {
        filled(&self.dos_and_donts)
    }

    pub fn is_blank(&self) -> bool {
        self.diagnosis().is_none()
            && self.personality().is_none()
            && self.strategies().is_none()
            && self.avoid().is_none()
            && self.goals().is_none()
            && self.dos_and_donts().is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExerciseRecommendation {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub exercise_text: String,
    pub recommended_at: DateTime<Utc>,
    /// `None` while pending, `Some(true)` once tried, `Some(false)` if declined.
    pub completed: Option<bool>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExerciseRecommendation {
    pub fn is_pending(&self) -> bool {
        self.completed.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Free,
    Plus,
    Unlimited,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Free => "free",
            PlanType::Plus => "plus",
            PlanType::Unlimited => "unlimited",
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, PlanType::Unlimited)
    }
}

impl FromStr for PlanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(PlanType::Free),
            "plus" => Ok(PlanType::Plus),
            // "premium" is the older name of the uncapped tier
            "unlimited" | "premium" => Ok(PlanType::Unlimited),
            other => Err(format!("unknown plan type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaState {
    pub owner_id: Uuid,
    pub plan_type: PlanType,
    /// `-1` means no cap.
    pub daily_limit: i32,
    pub messages_used_today: i32,
}

impl QuotaState {
    pub fn is_unlimited(&self) -> bool {
        self.plan_type.is_unlimited() || self.daily_limit < 0
    }

    pub fn usage(&self) -> QuotaUsage {
        let unlimited = self.is_unlimited();
        QuotaUsage {
            used: self.messages_used_today.max(0) as u32,
            limit: if unlimited {
                None
            } else {
                Some(self.daily_limit.max(0) as u32)
            },
            unlimited,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub used: u32,
    pub limit: Option<u32>,
    pub unlimited: bool,
}

impl QuotaUsage {
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|limit| limit.saturating_sub(self.used))
    }

    /// Line shown under the chat input, e.g. "2 of 3 messages used today".
    pub fn summary(&self) -> String {
        match self.limit {
            Some(limit) if !self.unlimited => {
                format!("{} of {} messages used today", self.used, limit)
            }
            _ => "Unlimited messages".to_string(),
        }
    }
}
