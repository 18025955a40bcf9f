//! Errors from the board and repository hosts.

use thiserror::Error;

use crate::credentials::CredentialError;

/// Failure talking to an external host (Notion or GitHub).
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The request never produced a response (DNS, TLS, timeout...).
    #[error("Request failed: {0}")]
    Transport(String),

    /// The host answered with a non-success status.
    #[error("Remote error (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("Reference not found: {0}")]
    RefNotFound(String),

    #[error("Reference already exists: {0}")]
    RefExists(String),

    /// Rejected before any request was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response arrived but did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// The pull request was created, but requesting reviewers failed.
    #[error("Pull request #{number} was created at {url}, but requesting reviewers failed: {message}")]
    ReviewersNotRequested {
        number: u64,
        url: String,
        message: String,
    },
}

impl HostError {
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        HostError::Remote {
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            HostError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HostError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            HostError::Decode(e.to_string())
        } else {
            HostError::Transport(e.to_string())
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;
