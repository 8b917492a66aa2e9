//! Turns a chat line into a [`CommandRequest`].

mod llm;
mod rules;

pub use llm::{parse_llm_reply, LlmClassifier};
pub use rules::RuleClassifier;

use crate::command::CommandRequest;
use crate::history::ConversationHistory;
use anyhow::{Context, Result};
use async_trait::async_trait;

#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// `history` holds earlier turns, oldest first, for resolving references
    /// such as "the first one".
    async fn classify(&self, text: &str, history: &ConversationHistory) -> Result<CommandRequest>;
}

/// A line written as a JSON command (`{"action": ..., "payload": {...}}`)
/// bypasses classification.
pub fn parse_command_json(text: &str) -> Option<Result<CommandRequest>> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    Some(serde_json::from_str(trimmed).context("Invalid command JSON"))
}
