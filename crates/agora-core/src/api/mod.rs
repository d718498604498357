pub mod error;
pub mod groq;
pub mod provider;

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

pub use error::ApiError;
pub use groq::GroqProvider;
pub use provider::{ChatMessage, ChatRole, ContentProvider};

use crate::config::ContentConfig;

static SPEAKER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used, clippy::let_and_return)]
    let pattern = Regex::new(r"^\w+\s*[:—\-]\s*").unwrap();
    pattern
});

/// Primary + backup content sources behind one call. On a transport
/// failure the primary is substituted exactly once by the backup; a second
/// failure propagates and the caller skips the turn.
#[derive(Clone)]
pub struct ContentClient {
    primary: Arc<dyn ContentProvider>,
    backup: Arc<dyn ContentProvider>,
    max_words: usize,
}

impl ContentClient {
    pub fn new(
        primary: Arc<dyn ContentProvider>,
        backup: Arc<dyn ContentProvider>,
        max_words: usize,
    ) -> Self {
        Self {
            primary,
            backup,
            max_words,
        }
    }

    /// Build the production primary/backup pair from one `ContentConfig`.
    pub fn from_config(config: &ContentConfig, max_words: usize) -> Self {
        let http_client = reqwest::Client::new();
        let primary = GroqProvider::new(http_client.clone(), config, &config.primary_model);
        let backup = GroqProvider::new(http_client, config, &config.backup_model);
        Self::new(Arc::new(primary), Arc::new(backup), max_words)
    }

    pub async fn generate(
        &self,
        system: &str,
        history: &[ChatMessage],
        instruction: &str,
    ) -> Result<String, ApiError> {
        let text = match self.primary.complete(system, history, instruction).await {
            Ok(text) => text,
            Err(error) => {
                warn!(
                    model = %self.primary.model(),
                    backup = %self.backup.model(),
                    %error,
                    "primary content source failed, substituting backup"
                );
                self.backup.complete(system, history, instruction).await?
            }
        };
        Ok(sanitize(&text, self.max_words))
    }
}

/// Strip a leaking `Speaker:` prefix and wrapping quotes, enforce the
/// word-count bound, and collapse whitespace so the streamed word tokens
/// reassemble into the stored text exactly.
fn sanitize(raw: &str, max_words: usize) -> String {
    let trimmed = raw.trim();
    let stripped = SPEAKER_PREFIX.replace(trimmed, "");
    let unquoted = stripped.trim_matches(['"', '\'']).trim();

    let words: Vec<&str> = unquoted.split_whitespace().collect();
    words[..words.len().min(max_words)].join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        model: &'static str,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn ok(model: &'static str) -> Self {
            Self {
                model,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(model: &'static str) -> Self {
            Self {
                model,
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentProvider for StubProvider {
        fn model(&self) -> &str {
            self.model
        }

        async fn complete(
            &self,
            _system: &str,
            _history: &[ChatMessage],
            _instruction: &str,
        ) -> Result<String, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ApiError::NoChoices {
                    provider: "stub".to_string(),
                })
            } else {
                Ok(format!("reply from {}", self.model))
            }
        }
    }

    #[tokio::test]
    async fn uses_primary_when_it_succeeds() {
        let primary = Arc::new(StubProvider::ok("primary"));
        let backup = Arc::new(StubProvider::ok("backup"));
        let client = ContentClient::new(primary.clone(), backup.clone(), 80);

        let text = client.generate("sys", &[], "go").await.unwrap();
        assert_eq!(text, "reply from primary");
        assert_eq!(backup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn substitutes_backup_exactly_once() {
        let primary = Arc::new(StubProvider::failing("primary"));
        let backup = Arc::new(StubProvider::ok("backup"));
        let client = ContentClient::new(primary.clone(), backup.clone(), 80);

        let text = client.generate("sys", &[], "go").await.unwrap();
        assert_eq!(text, "reply from backup");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(backup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn double_failure_propagates() {
        let primary = Arc::new(StubProvider::failing("primary"));
        let backup = Arc::new(StubProvider::failing("backup"));
        let client = ContentClient::new(primary, backup.clone(), 80);

        let err = client.generate("sys", &[], "go").await.unwrap_err();
        assert!(matches!(err, ApiError::NoChoices { .. }));
        assert_eq!(backup.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sanitize_strips_speaker_prefix_and_quotes() {
        assert_eq!(sanitize("Nova: we must act", 80), "we must act");
        assert_eq!(sanitize("Axiom — the data says no", 80), "the data says no");
        assert_eq!(sanitize("\"quoted answer\"", 80), "quoted answer");
        assert_eq!(sanitize("  'inner voice'  ", 80), "inner voice");
    }

    #[test]
    fn sanitize_enforces_word_cap() {
        let long = (0..100).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let capped = sanitize(&long, 80);
        assert_eq!(capped.split_whitespace().count(), 80);
        assert!(capped.starts_with("w0 w1"));
    }

    #[test]
    fn sanitize_keeps_plain_text_untouched() {
        assert_eq!(sanitize("plain statement, no prefix", 80), "plain statement, no prefix");
    }
}
