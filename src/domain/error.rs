use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize)]
pub enum AppError {
    Internal(String),
    NotFound(String),
    ValidationError(String),
    ParseError(String),
    CredentialError(String),
    RateLimitError(String),
    TransportError(String),
    InvalidResponseError(String),
    BackendError(String),
    ConfigError(String),
    Cancelled(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::CredentialError(msg) => write!(f, "Credential error: {}", msg),
            AppError::RateLimitError(msg) => write!(f, "Rate limit error: {}", msg),
            AppError::TransportError(msg) => write!(f, "Transport error: {}", msg),
            AppError::InvalidResponseError(msg) => write!(f, "Invalid response: {}", msg),
            AppError::BackendError(msg) => write!(f, "Backend error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::Cancelled(msg) => write!(f, "Cancelled: {}", msg),
        }
    }
}

// Implement std::error::Error so host applications can box and report these uniformly
impl std::error::Error for AppError {}

pub type Result<T> = std::result::Result<T, AppError>;
