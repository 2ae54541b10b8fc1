use tracing::debug;

use crate::models::chat::ChatMessage;
use super::types::{PromptStyle, Turn};

/// Turns the memory window plus the new input into chat messages
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    base_instruction: String,
    style: PromptStyle,
}

impl ContextBuilder {
    pub fn new(base_instruction: String, style: PromptStyle) -> Self {
        Self { base_instruction, style }
    }

    pub fn default_base_instruction() -> String {
        "The following is a friendly conversation between a human and an AI. \
The AI is talkative and provides lots of specific details from its context. \
If the AI does not know the answer to a question, it truthfully says it does not know."
            .to_string()
    }

    pub fn build<'a>(
        &self,
        history: impl Iterator<Item = &'a Turn>,
        current_message: &str,
    ) -> Vec<ChatMessage> {
        let messages = match self.style {
            PromptStyle::Chat => self.build_chat(history, current_message),
            PromptStyle::Transcript => {
                vec![ChatMessage::user(self.build_transcript(history, current_message))]
            }
        };

        debug!("Built context: style={:?}, messages={}", self.style, messages.len());
        messages
    }

    fn build_chat<'a>(
        &self,
        history: impl Iterator<Item = &'a Turn>,
        current_message: &str,
    ) -> Vec<ChatMessage> {
        let (lower, _) = history.size_hint();
        let mut messages = Vec::with_capacity(2 + lower * 2);

        if !self.base_instruction.is_empty() {
            messages.push(ChatMessage::system(self.base_instruction.clone()));
        }

        for turn in history {
            messages.push(ChatMessage::user(turn.user_message.clone()));
            messages.push(ChatMessage::assistant(turn.model_reply.clone()));
        }

        messages.push(ChatMessage::user(current_message));
        messages
    }

    fn build_transcript<'a>(
        &self,
        history: impl Iterator<Item = &'a Turn>,
        current_message: &str,
    ) -> String {
        let mut lines = Vec::new();

        if !self.base_instruction.is_empty() {
            lines.push(self.base_instruction.clone());
            lines.push(String::new());
        }

        lines.push("Current conversation:".to_string());
        for turn in history {
            lines.push(format!("Human: {}", turn.user_message));
            lines.push(format!("AI: {}", turn.model_reply));
        }
        lines.push(format!("Human: {}", current_message));
        lines.push("AI:".to_string());

        lines.join("\n")
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(Self::default_base_instruction(), PromptStyle::Chat)
    }
}
