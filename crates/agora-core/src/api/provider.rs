use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::api::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ChatRole {
    #[serde(rename = "system")]
    #[strum(serialize = "system")]
    System,
    #[serde(rename = "user")]
    #[strum(serialize = "user")]
    User,
    #[serde(rename = "assistant")]
    #[strum(serialize = "assistant")]
    Assistant,
}

/// One entry of the bounded conversation context handed to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A single content source: persona profile + bounded recent history + a
/// turn instruction in, one short utterance out.
#[async_trait]
pub trait ContentProvider: Send + Sync + 'static {
    /// Model identifier, for logging.
    fn model(&self) -> &str;

    async fn complete(
        &self,
        system: &str,
        history: &[ChatMessage],
        instruction: &str,
    ) -> Result<String, ApiError>;
}
