use std::sync::Arc;

use tracing::warn;

use crate::clients::{ChatClient, ChatStream, ClientError};
use crate::message::Message;

use super::prompts::{self, Tone};

/// Picks a delivery tone from the visitor description.
///
/// Selection failures never abort the exchange; they fall back to
/// [`Tone::FALLBACK`], as does a missing description.
pub(crate) async fn select_tone(
    chat: &Arc<dyn ChatClient>,
    user_description: Option<&str>,
) -> Tone {
    let Some(description) = user_description.filter(|d| !d.trim().is_empty()) else {
        return Tone::FALLBACK;
    };
    let messages = [Message::user(description)];
    match chat
        .complete(&prompts::select_tone_system_prompt(), &messages)
        .await
    {
        Ok(raw) => Tone::parse(&raw),
        Err(e) => {
            warn!(error = %e, "tone selection failed, using fallback");
            Tone::FALLBACK
        }
    }
}

/// Starts the streaming tone rewrite of an assembled answer.
pub(crate) async fn rewrite_stream(
    chat: &Arc<dyn ChatClient>,
    answer: &str,
    tone: Tone,
    user_description: Option<&str>,
    first_turn: bool,
) -> Result<ChatStream, ClientError> {
    let mut content = String::from("Answer to rewrite:\n");
    content.push_str(answer);
    if let Some(description) = user_description {
        content.push_str("\n\nVisitor description:\n");
        content.push_str(description);
    }
    let messages = [Message::user(&content)];
    chat.stream(
        &prompts::tone_rewrite_system_prompt(tone, first_turn),
        &messages,
    )
    .await
}
