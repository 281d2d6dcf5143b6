use thiserror::Error;

/// Why a model invocation failed. The composer maps every variant to
/// `plantcare_core::Error::Generation`.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("request timed out")]
    Timeout,

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable model response: {0}")]
    Decode(String),

    #[error("prompt blocked by the model: {0}")]
    Blocked(String),

    #[error("model returned no text")]
    Empty,
}

/// Prompt-in, text-out completion.
pub trait GenerationModel: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}
