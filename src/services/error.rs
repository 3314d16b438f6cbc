use thiserror::Error;

/// Domain failures surfaced by the grading core. Callers map these onto
/// transport-level responses; nothing below this layer compares error
/// strings to decide behavior.
#[derive(Debug, Error)]
pub(crate) enum DomainError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unavailable(String),
}

impl DomainError {
    /// Log the storage error with context and surface an `Unavailable`.
    pub(crate) fn db(err: sqlx::Error, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        DomainError::Unavailable(context.to_string())
    }
}
