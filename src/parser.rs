//! External detail parser: turns free-text listing descriptions into a
//! structured draft.
//!
//! Calls an OpenAI-compatible chat-completions endpoint and asks for a strict
//! JSON object. `Ok(None)` means "could not extract"; transport and protocol
//! failures surface as errors for the dialogue engine to translate.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::listing::ListingDraft;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "You extract real-estate listing fields from a WhatsApp message. \
Respond with a single JSON object with the string keys \"neighborhood\", \"street\", \
\"room_count\", \"description\", \"area\", \"price\". Use an empty string for anything \
the message does not state. Respond with JSON only, no prose.";

/// Contract for the text-to-draft extraction step.
#[async_trait]
pub trait DetailParser: Send + Sync {
    /// Parse listing details out of free text. `None` means the text could
    /// not be understood as a listing.
    async fn parse(&self, text: &str) -> Result<Option<ListingDraft>>;
}

/// Chat-completions-backed parser.
pub struct OpenAiParser {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiParser {
    /// Create from config values.
    pub fn from_config(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Pull the JSON object out of a model reply that may wrap it in code fences.
fn extract_json(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

/// A draft with no usable fields counts as a failed extraction.
fn is_empty_draft(draft: &ListingDraft) -> bool {
    draft.neighborhood.trim().is_empty()
        && draft.street.trim().is_empty()
        && draft.room_count.trim().is_empty()
        && draft.description.trim().is_empty()
        && draft.area.trim().is_empty()
        && draft.price.trim().is_empty()
}

#[async_trait]
impl DetailParser for OpenAiParser {
    async fn parse(&self, text: &str) -> Result<Option<ListingDraft>> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: text.to_string(),
                },
            ],
            temperature: 0.0,
        };

        debug!(model = %self.model, "parser: POST chat/completions");
        let resp = self
            .client
            .post(format!("{OPENAI_BASE_URL}/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("parser request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("parser returned {status}: {text}"));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .context("parser: failed to decode response body")?;

        let Some(content) = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
        else {
            return Ok(None);
        };

        let Some(json) = extract_json(content) else {
            return Ok(None);
        };

        match serde_json::from_str::<ListingDraft>(json) {
            Ok(draft) if is_empty_draft(&draft) => Ok(None),
            Ok(draft) => Ok(Some(draft)),
            Err(_) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        let content = r#"{"neighborhood":"Acme Heights"}"#;
        assert_eq!(extract_json(content), Some(content));
    }

    #[test]
    fn test_extract_json_fenced() {
        let content = "```json\n{\"street\":\"Elm St\"}\n```";
        assert_eq!(extract_json(content), Some("{\"street\":\"Elm St\"}"));
    }

    #[test]
    fn test_extract_json_missing() {
        assert_eq!(extract_json("sorry, I cannot help with that"), None);
    }

    #[test]
    fn test_empty_draft_detection() {
        assert!(is_empty_draft(&ListingDraft::default()));
        let draft = ListingDraft {
            street: "Elm St".to_string(),
            ..Default::default()
        };
        assert!(!is_empty_draft(&draft));
    }

    #[test]
    fn test_chat_request_serialization() {
        let body = ChatRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: "3 + 1 in Acme Heights".to_string(),
            }],
            temperature: 0.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_chat_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"{\"neighborhood\":\"Acme Heights\",\"street\":\"Elm St\",\"room_count\":\"3 + 1\",\"description\":\"bright flat\",\"area\":\"150\",\"price\":\"250000\"}"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(json).unwrap();
        let content = resp.choices[0].message.content.as_deref().unwrap();
        let draft: ListingDraft = serde_json::from_str(extract_json(content).unwrap()).unwrap();
        assert_eq!(draft.neighborhood, "Acme Heights");
        assert_eq!(draft.price, "250000");
    }
}
