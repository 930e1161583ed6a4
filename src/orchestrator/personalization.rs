use std::fmt::Write;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::internal::{ExerciseRecommendation, PersonalizationProfile};
use crate::storage::repository::{ChatRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Failed to load personalization: {0}")]
    Repository(#[from] RepositoryError),
}

/// A system prompt together with the owner it was composed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    owner_id: Uuid,
    text: String,
}

impl ComposedPrompt {
    /// The base prompt alone, used when personalization cannot be loaded.
    pub fn bare(base_prompt: &str, owner_id: Uuid) -> Self {
        Self {
            owner_id,
            text: base_prompt.to_string(),
        }
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

pub struct PersonalizationComposer {
    repo: Arc<dyn ChatRepository + Send + Sync>,
}

impl PersonalizationComposer {
    pub fn new(repo: Arc<dyn ChatRepository + Send + Sync>) -> Self {
        Self { repo }
    }

    /// Builds the system prompt for one model call. Reads the profile and
    /// the pending exercise fresh on every call.
    pub async fn compose(
        &self,
        base_prompt: &str,
        owner_id: Uuid,
    ) -> Result<ComposedPrompt, ComposeError> {
        let profile = self.repo.find_profile(owner_id).await?;
        let pending = self.repo.latest_pending_exercise(owner_id).await?;

        Ok(ComposedPrompt {
            owner_id,
            text: render(base_prompt, profile.as_ref(), pending.as_ref()),
        })
    }
}

/// Renders base prompt, personalization block, exercise block and
/// behavioral instructions, in that order.
pub fn render(
    base_prompt: &str,
    profile: Option<&PersonalizationProfile>,
    pending: Option<&ExerciseRecommendation>,
) -> String {
    let mut prompt = base_prompt.trim_end().to_string();
    let profile = profile.filter(|p| !p.is_blank());

    if let Some(profile) = profile {
        prompt.push_str("\n\nPATIENT PERSONALIZATION:");
        let fields = [
            ("Diagnosis", profile.diagnosis()),
            ("Personality traits", profile.personality()),
            ("Helpful strategies", profile.strategies()),
            ("Things to avoid", profile.avoid()),
            ("Clinical goals", profile.goals()),
            ("Dos and don'ts", profile.dos_and_donts()),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                // writing to a String cannot fail
                let _ = write!(prompt, "\n- {}: {}", label, value);
            }
        }
    }

    prompt.push_str("\n\nEXERCISE FOLLOW-UP:\n");
    match pending {
        Some(exercise) => {
            let _ = write!(
                prompt,
                "You previously recommended this exercise: \"{}\".\n\
                 Early in your reply, ask whether they had a chance to try it. \
                 If they did, celebrate the effort and ask what they noticed. \
                 If they did not, be gentle and encouraging, never critical, and \
                 offer to adapt it. Listen for phrases like \"I tried it\", \
                 \"I did it\" or \"not yet\" in their answer.",
                exercise.exercise_text
            );
        }
        None => {
            prompt.push_str(
                "When it fits the conversation, proactively suggest one simple, \
                 actionable, evidence-based coping exercise (breathing, grounding, \
                 journaling, a short walk). Phrase it as a direct instruction such \
                 as \"Try this...\" or \"Practice this...\" and keep the steps concrete.",
            );
        }
    }

    prompt.push_str("\n\nBEHAVIORAL INSTRUCTIONS:");
    match profile.and_then(|p| p.personality()) {
        Some(personality) => {
            let _ = write!(
                prompt,
                "\n- Tailor your tone to this personality: {}.",
                personality
            );
        }
        None => prompt.push_str("\n- Use a warm, calm and conversational tone."),
    }
    if let Some(avoid) = profile.and_then(|p| p.avoid()) {
        let _ = write!(
            prompt,
            "\n- Actively avoid these topics and approaches: {}.",
            avoid
        );
    }
    if let Some(goals) = profile.and_then(|p| p.goals()) {
        let _ = write!(
            prompt,
            "\n- Keep these clinical goals in view and gently steer toward them: {}.",
            goals
        );
    }
    prompt.push_str(
        "\n- Be empathetic and validating.\
         \n- Never diagnose, prescribe medication, or replace their clinician.\
         \n- If they mention self-harm or being in danger, urge them to contact \
         emergency services or their clinician right away.",
    );

    prompt
}
