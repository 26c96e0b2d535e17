//! Error types shared by the tools, the agent runner and the research flow.

use thiserror::Error;

/// Errors raised while talking to the Sectors API or running an agent.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// The Sectors API answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    Transport { status: u16, url: String },

    /// The request never produced a status (DNS, connect, timeout, body read).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// An argument was rejected before any network access.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An agent's final answer does not have the declared shape.
    #[error("Unexpected agent output: {0}")]
    ShapeMismatch(String),

    /// The chat completions endpoint failed or returned something unusable.
    #[error("LLM error: {0}")]
    Llm(String),

    /// The agent loop could not reach a final answer.
    #[error("Agent error: {0}")]
    Agent(String),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing operator output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScoutError {
    /// Whether a tool failure must abort the agent run instead of being
    /// reported back to the model.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScoutError::Transport { .. } | ScoutError::Request(_) | ScoutError::InvalidArgument(_)
        )
    }
}

/// Result type alias for sectorscout operations.
pub type Result<T> = std::result::Result<T, ScoutError>;
