use thiserror::Error;

#[derive(Error, Debug)]
pub enum JotterError {
    #[error("{0}")]
    ReferenceNotFound(String),

    #[error("Remote operation failed: {message}")]
    Remote { status_code: u16, message: String },

    #[error("Store dispatch failed: {0}")]
    Store(String),
}

impl JotterError {
    /// Status code used when this error is pushed onto the error channel.
    pub fn status_code(&self) -> u16 {
        match self {
            JotterError::Remote { status_code, .. } => *status_code,
            JotterError::ReferenceNotFound(_) | JotterError::Store(_) => 500,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            status_code: self.status_code(),
            message: self.to_string(),
        }
    }
}

/// Payload delivered to the shared error channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub status_code: u16,
    pub message: String,
}

/// Sink for user-visible error reporting. The host app decides how a report
/// is surfaced (error page, toast, retry affordance).
pub trait ErrorChannel: Send + Sync {
    fn report(&self, report: ErrorReport);
}

pub type Result<T> = std::result::Result<T, JotterError>;
