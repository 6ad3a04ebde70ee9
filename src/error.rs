use thiserror::Error;

/// Errors produced by the AI suggestion subsystem.
///
/// Stale-run cancellation has no variant here: a superseded continuation
/// stops at its next run-token check and never produces a value, so there
/// is nothing to propagate.
#[derive(Debug, Error)]
pub enum AiError {
    /// No API key was configured. Disables the subsystem for the session.
    #[error("Missing Gemini API key. Set MAPART_AI_GEMINI_API_KEY or GEMINI_API_KEY.")]
    MissingApiKey,

    /// Rate limit, server overload, or a network-level failure. Retried by
    /// the gateway; surfaced only once retries are exhausted.
    #[error("{message}")]
    Transient { status: Option<u16>, message: String },

    /// Any other non-2xx service response. Retrying will not help.
    #[error("{message}")]
    Permanent { message: String },

    /// The model response did not contain decodable JSON.
    #[error("{0}")]
    Parse(String),

    /// The uploaded image could not be converted for analysis.
    #[error("{0}")]
    Image(String),
}

impl AiError {
    /// Whether the gateway may retry the failed attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, AiError::Transient { .. })
    }
}

impl From<AiError> for String {
    fn from(err: AiError) -> Self {
        err.to_string()
    }
}
