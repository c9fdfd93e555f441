/// Convenience result type used across scenereel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Every variant is local to the operation that produced it. None of them leave the timeline in
/// a partially-mutated state.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid user-provided data or a failed precondition caught before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while validating or sampling item animations.
    #[error("animation error: {0}")]
    Animation(String),

    /// Errors while evaluating timeline or raster state.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing session documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Network or transport failure before a status payload was obtained.
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable failure description.
        message: String,
        /// Whether re-submitting the same request may succeed.
        retryable: bool,
    },

    /// The server reported `FAILED` for a generation job.
    #[error("job failed: {0}")]
    JobFailed(String),

    /// A job for the same `(session, kind, layer)` tuple is still pending.
    #[error("job already pending: {0}")]
    JobAlreadyPending(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    /// Build a [`ReelError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a retryable [`ReelError::Transport`] value.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport {
            message: msg.into(),
            retryable: true,
        }
    }

    /// Whether the failed operation may be retried as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                retryable: true,
                ..
            }
        )
    }
}

impl From<serde_json::Error> for ReelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
