//! Error types for accounts-core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Token signature verification failed")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Template error: {0}")]
    Template(String),

    #[error("Password rejected: {0}")]
    PasswordPolicy(String),

    #[error("Password hash error: {0}")]
    Hash(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
