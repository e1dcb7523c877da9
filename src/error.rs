use thiserror::Error;

pub type SolverResult<T> = Result<T, SolverError>;

/// Failures surfaced to the challenge host. Nothing here is retried locally.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Malformed config blob, unknown region, or unusable credentials.
    #[error("Invalid solver configuration: {0}")]
    Config(String),

    /// The provider answered with a non-success status.
    #[error("DNS provider returned HTTP {status}: {code} {message}")]
    Provider {
        status: u16,
        code: String,
        message: String,
    },

    /// The request never produced a usable provider response.
    #[error("DNS provider request failed: {0}")]
    Transport(String),

    /// A local invariant failed before any remote call was attempted.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Solver used before initialize was called")]
    NotInitialized,
}

impl SolverError {
    /// True for errors that came back from (or on the way to) the remote provider.
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Transport(_))
    }
}

impl From<reqwest::Error> for SolverError {
    fn from(e: reqwest::Error) -> Self {
        SolverError::Transport(e.to_string())
    }
}
