//! Error taxonomy shared by every account-scoped operation.

/// Domain error returned by the service layer and the caloric engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credential missing, malformed, badly signed or expired.
    #[error("authentication required")]
    Unauthenticated,
    /// Malformed or out-of-range input for a persisted entity.
    #[error("{0}")]
    Validation(String),
    /// Referenced entity does not exist for this user.
    #[error("{0}")]
    NotFound(String),
    /// Precondition violated for a pure computation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("storage: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
