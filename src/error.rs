/// Error taxonomy for the workflow core.
use rusqlite::ErrorCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Missing or malformed input, rejected before any write.
    #[error("{0}")]
    Validation(String),

    /// The write would duplicate a decision that already exists.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// JSON body returned to callers for any failed operation.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        WorkflowError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        WorkflowError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        WorkflowError::Conflict(message.into())
    }

    /// HTTP-equivalent status code of the error class.
    pub fn status_code(&self) -> u16 {
        match self {
            WorkflowError::Validation(_) => 400,
            WorkflowError::NotFound(_) => 404,
            WorkflowError::Conflict(_) => 409,
            WorkflowError::Store(_) => 500,
        }
    }

    /// Caller-facing message. Store failures are reported generically.
    pub fn public_message(&self) -> String {
        match self {
            WorkflowError::Store(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.public_message(),
        }
    }
}

/// True when the store rejected a write because of a UNIQUE/constraint rule.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}
