use thiserror::Error;

/// Transport-level content-source failures. All variants are transient from
/// the engine's point of view: the turn is retried once against the backup
/// model and then skipped for this iteration, never surfaced to viewers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Authentication failed for {provider}: {details}")]
    AuthenticationFailed { provider: String, details: String },

    #[error("Rate limited by {provider}: {details}")]
    RateLimited { provider: String, details: String },

    #[error("{provider} server error (Status: {status_code}): {details}")]
    ServerError {
        provider: String,
        status_code: u16,
        details: String,
    },

    #[error("Failed to parse response from {provider}: {details}")]
    ResponseParsingError { provider: String, details: String },

    #[error("API returned no choices for {provider}")]
    NoChoices { provider: String },

    #[error("Invalid request to {provider}: {details}")]
    InvalidRequest { provider: String, details: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}
