use std::time::Duration;

use thiserror::Error;

/// Failure to obtain a verdict for one test case from the execution service.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Execution service timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Execution service error: {0}")]
    Service(String),
}

impl ExecutionError {
    /// Status text recorded on the test case result.
    pub fn status_description(&self) -> &'static str {
        match self {
            Self::UnsupportedLanguage(_) => "Unsupported Language",
            Self::Timeout(_) => "Time Limit Exceeded (Gateway Timeout)",
            Self::Network(_) => "Execution Service Unavailable",
            Self::Malformed(_) => "Malformed Response",
            Self::Service(_) => "Execution Service Error",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutionError>;
