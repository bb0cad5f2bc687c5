use thiserror::Error;

/// Errors surfaced to whoever drives prompt generation or improvement.
///
/// The `Display` text is what the user sees.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("{0}")]
    Validation(String),

    #[error("Improvement service is not available: {0}")]
    Configuration(String),

    #[error("Invalid model ID: {0}")]
    InvalidModel(String),

    #[error("Rate limit exceeded. Please try again in a moment. (Attempt {attempts}/{max_retries})")]
    RateLimit {
        attempts: u32,
        max_retries: u32,
        message: String,
    },

    #[error("Error improving prompt. {0}")]
    Remote(String),
}

impl PromptError {
    pub fn empty_instruction() -> Self {
        PromptError::Validation("Please enter an instruction".to_string())
    }

    /// Validation errors belong next to the field that caused them; everything
    /// else goes to the general error area.
    pub fn is_validation(&self) -> bool {
        matches!(self, PromptError::Validation(_))
    }
}
