use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced to the caller of a capture invocation.
///
/// Item- and group-level failures never show up here: they are folded into the
/// job summary. Only request problems and failures outside those boundaries do.
#[derive(Debug, Error)]
pub enum CapturaError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("unhandled error: {0}")]
    Unhandled(String),

    #[error("job store error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Coarse classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Client,
    NotFound,
    Server,
}

impl CapturaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CapturaError::Validation(_) => ErrorKind::Client,
            CapturaError::NotFound(_) => ErrorKind::NotFound,
            CapturaError::Unhandled(_) | CapturaError::Persistence(_) => ErrorKind::Server,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Client => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Server => 500,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            CapturaError::Validation(_) => "validation_error",
            CapturaError::NotFound(_) => "not_found",
            CapturaError::Unhandled(_) => "unhandled_error",
            CapturaError::Persistence(_) => "persistence_error",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        }
    }
}

/// Body of a non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Login against a court system failed. Fatal to one group only.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AuthenticationError(pub String);

/// The capture worker itself failed for one item (as opposed to in-band item errors).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct WorkerError(pub String);

#[derive(Debug, Error)]
pub enum LockError {
    /// Another invocation holds the lock for this key.
    #[error("lock already held: {key}")]
    Held { key: String },

    #[error("lock service error: {0}")]
    Service(String),
}

impl From<reqwest::Error> for LockError {
    fn from(err: reqwest::Error) -> Self {
        LockError::Service(err.to_string())
    }
}

/// An audit or job-store write failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Backend(String),
}

/// Lookup failures from the directory of requesters, credentials and processes.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("{0}")]
    Missing(String),

    #[error("directory backend error: {0}")]
    Backend(String),
}
