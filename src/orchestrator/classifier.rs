//! Deterministic, offline text classification for the exercise lifecycle.
//!
//! The orchestrator only sees the [`ExerciseClassifier`] trait, so the keyword
//! heuristics here can be replaced by a model-backed classifier later.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest exercise snippet kept from an assistant message, in characters.
pub const MAX_SNIPPET_CHARS: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// The user says they tried the exercise.
    Confirmed,
    /// The user says they did not.
    Declined,
    Unrelated,
}

pub trait ExerciseClassifier: Send + Sync {
    /// Returns the exercise snippet when `assistant_text` recommends one.
    fn detect_recommendation(&self, assistant_text: &str) -> Option<String>;

    fn classify_reply(&self, user_text: &str) -> ReplyKind;
}

static SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?\n]+[.!?…]*").expect("sentence pattern is valid"));

// Imperative opener, optionally softened ("You could try", "Let's practice").
static IMPERATIVE_OPENER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^\s*[-*•\d.)\s]*
        (?:(?:let's|let\ us|maybe|perhaps|please|why\ not|i'd\ suggest|i\ suggest|i\ recommend|you\ (?:could|might|can)(?:\ also)?)[,\s]+)?
        (?:try|practice|practise|take|spend|set\ aside|write\ down|write|close\ your\ eyes|breathe|go\ for|do|give|start|focus\ on|notice|name|place|tense|repeat|list)\b",
    )
    .expect("imperative pattern is valid")
});

static EXERCISE_NOUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:exercises?|techniques?|breathing|breaths?|inhale|exhale|meditat(?:e|ion)|mindful(?:ness)?|grounding|journal(?:ing)?|stretch(?:es|ing)?|walk|yoga|relaxation|visuali[sz]ation|gratitude|body scan|muscle|routine|affirmations?|5-4-3-2-1|senses)\b",
    )
    .expect("exercise pattern is valid")
});

const NEGATIONS: &[&str] = &[
    "no", "not", "never", "didn't", "didnt", "haven't", "havent", "hasn't", "couldn't",
    "couldnt", "don't", "dont", "wasn't", "wasnt", "nope", "nah",
];

// Each phrase only counts when it points back at the exercise; see
// `refers_to_exercise`.
const DENIAL_PHRASES: &[&[&str]] = &[
    &["didn't", "try"],
    &["didnt", "try"],
    &["did", "not", "try"],
    &["haven't", "tried"],
    &["havent", "tried"],
    &["have", "not", "tried"],
    &["didn't", "get", "to"],
    &["didnt", "get", "to"],
    &["didn't", "get", "around", "to"],
    &["didn't", "do"],
    &["didnt", "do"],
    &["did", "not", "do"],
    &["couldn't", "do"],
    &["wasn't", "able", "to", "do"],
    &["wasn't", "able", "to", "try"],
    &["forgot", "to", "do"],
    &["forgot", "to", "try"],
    &["forgot", "about"],
];

const TRIAL_PHRASES: &[&[&str]] = &[
    &["i", "tried"],
    &["i've", "tried"],
    &["i", "have", "tried"],
    &["i", "did"],
    &["i", "practiced"],
    &["i", "practised"],
    &["i", "gave"],
    &["i've", "been", "doing"],
    &["i've", "been", "practicing"],
];

const REFERENCES: &[&str] = &["it", "that", "this", "them", "those"];

// How far past a phrase an exercise noun may sit ("I tried the breathing").
const REFERENCE_WINDOW: usize = 3;

// A bare "Not yet" answers the follow-up question; "not yet sure" does not.
static NOT_YET_ANSWER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*not\s+yet\s*(?:[,.!;:]|$)").expect("not-yet pattern is valid")
});

const OUTCOME_PHRASES: &[&[&str]] = &[
    &["it", "helped"],
    &["that", "helped"],
    &["it", "worked"],
    &["it", "really", "helped"],
];

const SHORT_AFFIRMATIVES: &[&str] = &["yes", "yeah", "yep", "yup", "done", "sure did"];
const SHORT_NEGATIVES: &[&str] = &["no", "nope", "nah"];
const SHORT_REPLY_MAX_TOKENS: usize = 4;

/// Keyword classifier. Biased toward precision: anything ambiguous is
/// [`ReplyKind::Unrelated`], since a false positive would close a real
/// pending exercise.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .replace(['\u{2019}', '\u{2018}'], "'")
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_matches('\'').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn contains_phrase(tokens: &[String], phrase: &[&str]) -> bool {
    tokens
        .windows(phrase.len())
        .any(|window| window.iter().zip(phrase).all(|(t, p)| t == p))
}

/// True when the tokens right after a phrase name the exercise: a pronoun
/// immediately, or an exercise noun within a few words.
fn refers_to_exercise(tokens: &[String], after: usize) -> bool {
    let Some(next) = tokens.get(after) else {
        return false;
    };
    if REFERENCES.contains(&next.as_str()) {
        return true;
    }
    let end = (after + REFERENCE_WINDOW).min(tokens.len());
    EXERCISE_NOUN.is_match(&tokens[after..end].join(" "))
}

fn contains_referring_phrase(tokens: &[String], phrases: &[&[&str]]) -> bool {
    phrases.iter().any(|phrase| {
        tokens
            .windows(phrase.len())
            .enumerate()
            .any(|(start, window)| {
                window.iter().zip(phrase.iter()).all(|(t, p)| t == p)
                    && refers_to_exercise(tokens, start + phrase.len())
            })
    })
}

fn truncate_snippet(sentence: &str) -> String {
    let trimmed = sentence.trim();
    if trimmed.chars().count() <= MAX_SNIPPET_CHARS {
        return trimmed.to_string();
    }
    let mut snippet: String = trimmed.chars().take(MAX_SNIPPET_CHARS).collect();
    snippet.push('…');
    snippet
}

impl ExerciseClassifier for KeywordClassifier {
    fn detect_recommendation(&self, assistant_text: &str) -> Option<String> {
        SENTENCE
            .find_iter(assistant_text)
            .map(|m| m.as_str())
            // questions are follow-ups ("Did you try the breathing exercise?")
            .filter(|sentence| !sentence.trim_end().ends_with('?'))
            .find(|sentence| {
                IMPERATIVE_OPENER.is_match(sentence) && EXERCISE_NOUN.is_match(sentence)
            })
            .map(truncate_snippet)
    }

    fn classify_reply(&self, user_text: &str) -> ReplyKind {
        let tokens = tokenize(user_text);
        if tokens.is_empty() {
            return ReplyKind::Unrelated;
        }

        if NOT_YET_ANSWER.is_match(user_text)
            || contains_referring_phrase(&tokens, DENIAL_PHRASES)
        {
            return ReplyKind::Declined;
        }

        if contains_referring_phrase(&tokens, TRIAL_PHRASES) {
            return ReplyKind::Confirmed;
        }

        let negated = tokens.iter().any(|t| NEGATIONS.contains(&t.as_str()));

        if !negated && OUTCOME_PHRASES.iter().any(|p| contains_phrase(&tokens, p)) {
            return ReplyKind::Confirmed;
        }

        if tokens.len() <= SHORT_REPLY_MAX_TOKENS {
            let joined = tokens.join(" ");
            let first = tokens[0].as_str();

            if !negated
                && SHORT_AFFIRMATIVES
                    .iter()
                    .any(|a| joined == *a || joined.starts_with(&format!("{} ", a)))
            {
                return ReplyKind::Confirmed;
            }

            let idiom = matches!(
                tokens.get(1).map(String::as_str),
                Some("problem" | "worries" | "worry")
            );
            if SHORT_NEGATIVES.contains(&first) && !idiom {
                return ReplyKind::Declined;
            }
        }

        ReplyKind::Unrelated
    }
}
