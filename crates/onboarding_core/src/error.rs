use shared::error::ErrorCode;
use thiserror::Error;

use crate::store::StoreKind;

/// Failure talking to the onboarding API.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote rejected request with status {status}: {message}")]
    Rejected {
        status: u16,
        code: Option<ErrorCode>,
        message: String,
    },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
}

impl RemoteError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            code: None,
            message: message.into(),
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Outcome of a store action that did not complete.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("{0} store already has an action in flight")]
    Busy(StoreKind),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ActionError {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote(RemoteError::Rejected { status, .. }) => Some(*status),
            Self::Remote(RemoteError::Transport(err)) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;
