use serde_json::json;

use crate::corpus::language_of;
use crate::message::Message;

/// Delivery tones the rewrite stage can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    ChildFriendly,
    ElderFriendly,
    ProfessionalFriendly,
    CasualFriendly,
}

impl Tone {
    /// Fallback used whenever selection fails or yields something outside
    /// the catalogue.
    pub const FALLBACK: Tone = Tone::CasualFriendly;

    /// Parses a tone name, tolerating surrounding whitespace and case.
    /// Anything outside the catalogue maps to [`Tone::FALLBACK`].
    #[must_use]
    pub fn parse(raw: &str) -> Tone {
        match raw.trim().to_lowercase().as_str() {
            "child_friendly" => Tone::ChildFriendly,
            "elder_friendly" => Tone::ElderFriendly,
            "professional_friendly" => Tone::ProfessionalFriendly,
            "casual_friendly" => Tone::CasualFriendly,
            _ => Tone::FALLBACK,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::ChildFriendly => "child_friendly",
            Tone::ElderFriendly => "elder_friendly",
            Tone::ProfessionalFriendly => "professional_friendly",
            Tone::CasualFriendly => "casual_friendly",
        }
    }

    /// The audience this tone addresses, used inside the rewrite prompt.
    #[must_use]
    pub fn audience(&self) -> &'static str {
        match self {
            Tone::ChildFriendly => "a curious child; simple words, vivid comparisons",
            Tone::ElderFriendly => "an elderly visitor; unhurried, clear, respectful",
            Tone::ProfessionalFriendly => "an industry professional; precise and substantive",
            Tone::CasualFriendly => "a general visitor; relaxed and approachable",
        }
    }
}

/// Required response language, chosen from the script of the user's text.
#[must_use]
pub fn language_requirement(user_text: &str) -> &'static str {
    if language_of(user_text) == "chinese" {
        "Traditional Chinese"
    } else {
        "English"
    }
}

/// System prompt for primary answer generation.
#[must_use]
pub fn answer_system_prompt() -> String {
    "You are a museum docent. Answer the visitor's question using the \
     reference material in the user payload. If the reference does not \
     cover the question, say so honestly instead of inventing facts. \
     Respect the language_requirement field."
        .to_string()
}

/// System prompt for the search-query rewrite call.
#[must_use]
pub fn rewrite_query_system_prompt() -> String {
    "Rewrite the visitor's latest question into a standalone search query. \
     Resolve pronouns and elliptical references using the conversation \
     history. Reply with the rewritten query only, no commentary."
        .to_string()
}

/// System prompt for the tone-selection call.
#[must_use]
pub fn select_tone_system_prompt() -> String {
    "Given a description of the visitor, choose the best delivery tone. \
     Reply with exactly one of: child_friendly, elder_friendly, \
     professional_friendly, casual_friendly."
        .to_string()
}

/// System prompt for the streaming tone-rewrite call.
#[must_use]
pub fn tone_rewrite_system_prompt(tone: Tone, first_turn: bool) -> String {
    let mut prompt = format!(
        "Rewrite the assistant's answer for {}. Keep every fact intact and \
         keep the same language as the answer. Reply with the rewritten \
         answer only.",
        tone.audience()
    );
    if first_turn {
        prompt.push_str(
            " This is the visitor's first question; if a visual description \
             of them is given, you may acknowledge it briefly.",
        );
    }
    prompt
}

/// Builds the JSON user payload for primary answer generation.
///
/// History is flattened into numbered question/answer fields so the model
/// sees turn order explicitly. `rewritten_query` rides along as auxiliary
/// context when the query-rewrite stage ran; the question field always
/// carries the user's literal text.
#[must_use]
pub fn build_user_payload(
    user_text: &str,
    history: &[Message],
    rag_reference: &str,
    user_description: Option<&str>,
    rewritten_query: Option<&str>,
) -> String {
    let mut chat_history = Vec::new();
    let mut turn = 0usize;
    let mut pending_question: Option<&str> = None;
    for message in history {
        if message.has_role(Message::USER) {
            pending_question = Some(&message.content);
        } else if message.has_role(Message::ASSISTANT) {
            if let Some(question) = pending_question.take() {
                turn += 1;
                let mut pair = serde_json::Map::new();
                pair.insert(format!("Q{turn}"), json!(question));
                pair.insert(format!("A{turn}"), json!(message.content));
                chat_history.push(serde_json::Value::Object(pair));
            }
        }
    }

    let mut payload = json!({
        "user_question": user_text,
        "chat_history": chat_history,
        "rag_reference": rag_reference,
        "language_requirement": language_requirement(user_text),
    });
    if let Some(description) = user_description {
        payload["user_description"] = json!(description);
    }
    if let Some(rewritten) = rewritten_query {
        payload["rewritten_query"] = json!(rewritten);
    }
    payload.to_string()
}
