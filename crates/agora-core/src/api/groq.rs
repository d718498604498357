use async_trait::async_trait;
use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::error::ApiError;
use crate::api::provider::{ChatMessage, ChatRole, ContentProvider};
use crate::config::ContentConfig;

const PROVIDER_NAME: &str = "groq";

/// OpenAI-compatible chat-completions client pinned to one model. The
/// primary/backup pair used by the engine is two of these sharing one
/// `reqwest::Client`.
pub struct GroqProvider {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl GroqProvider {
    pub fn new(http_client: reqwest::Client, config: &ContentConfig, model: &str) -> Self {
        Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: model.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl ContentProvider for GroqProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system: &str,
        history: &[ChatMessage],
        instruction: &str,
    ) -> Result<String, ApiError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new(ChatRole::System, system));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::new(ChatRole::User, instruction));

        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            target: "api::groq",
            model = %self.model,
            history_len = history.len(),
            "requesting completion"
        );

        let response = self
            .http_client
            .post(self.endpoint())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::AuthenticationFailed {
                    provider: PROVIDER_NAME.to_string(),
                    details,
                },
                StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited {
                    provider: PROVIDER_NAME.to_string(),
                    details,
                },
                _ if status.is_server_error() => ApiError::ServerError {
                    provider: PROVIDER_NAME.to_string(),
                    status_code: status.as_u16(),
                    details,
                },
                _ => ApiError::InvalidRequest {
                    provider: PROVIDER_NAME.to_string(),
                    details,
                },
            });
        }

        let completion: CompletionResponse =
            response
                .json()
                .await
                .map_err(|e| ApiError::ResponseParsingError {
                    provider: PROVIDER_NAME.to_string(),
                    details: e.to_string(),
                })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::NoChoices {
                provider: PROVIDER_NAME.to_string(),
            })?;

        Ok(choice.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_handles_trailing_slash() {
        let mut config = ContentConfig::new("k".to_string());
        config.base_url = "https://api.groq.com/openai/v1/".to_string();
        let provider = GroqProvider::new(reqwest::Client::new(), &config, "m");
        assert_eq!(
            provider.endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn completion_response_parses_openai_shape() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hello there"}}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content, "hello there");
    }
}
