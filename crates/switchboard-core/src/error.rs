//! Error types for Switchboard

use thiserror::Error;

use crate::remote::TaskState;

/// Result type alias using Switchboard's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Switchboard error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Network errors (E100-E199)
    #[error("Network error: {0}. Check that the service is reachable.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}. Check your API key with `switchboard config show`.")]
    LLMError(String),

    #[error("Rate limited. Waiting {0} seconds before retry.")]
    RateLimited(u64),

    // Reasoning errors (E200-E299)
    #[error("Reasoning output could not be used: {0}")]
    ReasoningOutput(String),

    #[error("No model produced a completion: {0}")]
    NoSuitableModel(String),

    // Remote agent errors (E300-E399)
    #[error("Remote agent protocol error: {0}")]
    AgentProtocol(String),

    #[error("Unknown service '{0}'. Run `switchboard categories` to see configured services.")]
    UnknownService(String),

    #[error("Invalid task transition for {task_id}: {from} -> {to}")]
    InvalidTaskTransition {
        task_id: String,
        from: TaskState,
        to: TaskState,
    },

    // Classification errors (E400-E499)
    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Unknown category '{0}'")]
    UnknownCategory(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Generic errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NetworkError(_) => "E100",
            Self::LLMError(_) => "E101",
            Self::RateLimited(_) => "E102",
            Self::ReasoningOutput(_) => "E200",
            Self::NoSuitableModel(_) => "E201",
            Self::AgentProtocol(_) => "E300",
            Self::UnknownService(_) => "E301",
            Self::InvalidTaskTransition { .. } => "E302",
            Self::EmbeddingFailed(_) => "E400",
            Self::UnknownCategory(_) => "E401",
            Self::ConfigError(_) => "E600",
            Self::Json(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NetworkError(_) => Some("Check network connectivity and AGENT_URL".to_string()),
            Self::LLMError(_) => Some("Set SWITCHBOARD_API_KEY or OPENAI_API_KEY".to_string()),
            Self::UnknownService(_) | Self::UnknownCategory(_) => {
                Some("switchboard categories".to_string())
            }
            Self::ConfigError(_) => Some("switchboard config show".to_string()),
            _ => None,
        }
    }

    /// Whether this error came from the transport layer rather than the remote side
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::NetworkError(_))
    }
}
