//! Broker error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Account already exists")]
    AlreadyExists,

    #[error("Not found")]
    NotFound,

    /// Same error for an unknown account and a wrong password
    #[error("Invalid credentials")]
    AuthenticationFailed,

    #[error("Password reset required")]
    PasswordResetRequired,

    #[error("Email confirmation required")]
    ConfirmationRequired,

    #[error("Confirmation already redeemed")]
    AlreadyRedeemed,

    #[error("Malformed session token: {0}")]
    MalformedToken(String),

    #[error("Invalid session token signature")]
    InvalidSignature,

    #[error("Session expired")]
    Expired,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Notifier unavailable: {0}")]
    NotifierUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BrokerError {
    /// Whether this is one of the session token errors
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            BrokerError::MalformedToken(_) | BrokerError::InvalidSignature | BrokerError::Expired
        )
    }
}

impl From<accounts_core::Error> for BrokerError {
    fn from(e: accounts_core::Error) -> Self {
        use accounts_core::Error;

        match e {
            Error::MalformedToken(msg) => BrokerError::MalformedToken(msg),
            Error::InvalidSignature => BrokerError::InvalidSignature,
            Error::Expired => BrokerError::Expired,
            Error::PasswordPolicy(msg) => BrokerError::InvalidInput(msg),
            Error::Template(msg) => BrokerError::Internal(format!("template: {}", msg)),
            other => BrokerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            BrokerError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            BrokerError::AlreadyExists => (StatusCode::CONFLICT, "Account already exists"),
            BrokerError::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            BrokerError::AuthenticationFailed => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
            BrokerError::PasswordResetRequired => {
                (StatusCode::FORBIDDEN, "Password reset required")
            }
            BrokerError::ConfirmationRequired => {
                (StatusCode::FORBIDDEN, "Email confirmation required")
            }
            BrokerError::AlreadyRedeemed => {
                (StatusCode::CONFLICT, "Confirmation already redeemed")
            }
            BrokerError::MalformedToken(_) | BrokerError::InvalidSignature | BrokerError::Expired => {
                tracing::debug!("Rejected session: {}", self);
                (StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            BrokerError::StoreUnavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Store unavailable")
            }
            BrokerError::NotifierUnavailable(msg) => {
                tracing::error!("Notifier unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Notifier unavailable")
            }
            BrokerError::InvalidConfig(msg) => {
                tracing::error!("Invalid configuration: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            BrokerError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = json!({ "success": false, "reason": message });
        (status, axum::Json(body)).into_response()
    }
}
