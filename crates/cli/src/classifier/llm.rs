use super::{parse_command_json, Classifier, RuleClassifier};
use crate::command::{CommandAction, CommandRequest};
use crate::history::ConversationHistory;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const SYSTEM_PROMPT: &str = r#"You turn a user's message about meetings into exactly one JSON command.
Respond with ONLY a JSON object of the form {"action": "<action>", "payload": {...}}.

Actions:
- "schedule": create a meeting. Payload fields: "title", "date" (YYYY-MM-DD), "start_time" (HH:MM), "end_time" (HH:MM), "attendees" (list of strings), "location" (optional). Leave out fields the user did not give.
- "cancel": cancel a meeting. Payload fields: "meeting_id" (like M0001, only if the user gave one) and "description" (the user's words about the meeting).
- "query": find meetings. Payload fields: "query" (what to search for).

Earlier turns of the conversation come before the current message. Use them to resolve references such as "the first one" to a meeting id shown in an earlier answer.
Do not invent meeting ids, dates or attendees."#;

static JSON_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json)?\s*(\{[\s\S]*?\})\s*```").expect("Invalid regex"));

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: &'static str,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

/// Classifies with a chat model behind an Ollama-compatible `/api/chat`.
///
/// Any failure (transport, timeout, unusable reply) falls back to
/// [`RuleClassifier`].
pub struct LlmClassifier {
    client: Client,
    endpoint: String,
    model: String,
    timeout: Duration,
    fallback: RuleClassifier,
}

impl LlmClassifier {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build chat client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model: model.to_string(),
            timeout,
            fallback: RuleClassifier,
        })
    }

    async fn ask(&self, text: &str, history: &ConversationHistory) -> Result<CommandRequest> {
        let body = ChatRequest {
            model: &self.model,
            messages: build_messages(text, history),
            stream: false,
            format: "json",
            options: ChatOptions { temperature: 0.0 },
        };
        let reply: ChatResponse = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .context("Chat request failed")?
            .error_for_status()
            .context("Chat endpoint returned an error")?
            .json()
            .await
            .context("Chat response is not valid JSON")?;
        log::debug!("Chat model replied: {}", reply.message.content);

        let mut request = parse_llm_reply(&reply.message.content)?;
        if request.action == CommandAction::Cancel {
            if let Value::Object(payload) = &mut request.payload {
                payload
                    .entry("description")
                    .or_insert_with(|| Value::String(text.to_string()));
            }
        }
        Ok(request)
    }
}

#[async_trait]
impl Classifier for LlmClassifier {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn classify(
        &self,
        text: &str,
        history: &ConversationHistory,
    ) -> Result<CommandRequest> {
        if let Some(parsed) = parse_command_json(text) {
            return parsed;
        }
        match tokio::time::timeout(self.timeout, self.ask(text, history)).await {
            Ok(Ok(request)) => Ok(request),
            Ok(Err(err)) => {
                log::warn!("LLM classification failed ({err:#}); using rules");
                self.fallback.classify_line(text)
            }
            Err(_) => {
                log::warn!(
                    "LLM classification timed out after {} ms; using rules",
                    self.timeout.as_millis()
                );
                self.fallback.classify_line(text)
            }
        }
    }
}

fn message(role: &str, content: &str) -> ChatMessage {
    ChatMessage {
        role: role.to_string(),
        content: content.to_string(),
    }
}

/// System prompt, earlier turns as user/assistant pairs, then the new line.
fn build_messages(text: &str, history: &ConversationHistory) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(message("system", SYSTEM_PROMPT));
    for turn in history.turns() {
        messages.push(message("user", &turn.user));
        messages.push(message("assistant", &turn.agent));
    }
    messages.push(message("user", text));
    messages
}

/// Read a command out of a model reply, tolerating a fenced code block.
pub fn parse_llm_reply(content: &str) -> Result<CommandRequest> {
    let json = match JSON_BLOCK_RE.captures(content).and_then(|caps| caps.get(1)) {
        Some(block) => block.as_str(),
        None => content.trim(),
    };
    let mut request: CommandRequest =
        serde_json::from_str(json).map_err(|err| anyhow!("Unusable model reply: {err}"))?;
    if request.payload.is_null() {
        request.payload = Value::Object(Default::default());
    }
    Ok(request)
}
