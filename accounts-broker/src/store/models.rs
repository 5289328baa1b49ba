//! Data models for account storage

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Confirmation status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Registered, email not yet confirmed
    PendingConfirmation,
    /// Email confirmed through an account-creation code
    Confirmed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::PendingConfirmation => "pending_confirmation",
            AccountStatus::Confirmed => "confirmed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending_confirmation" => Some(AccountStatus::PendingConfirmation),
            "confirmed" => Some(AccountStatus::Confirmed),
            _ => None,
        }
    }
}

/// What a confirmation request confirms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// New account email confirmation
    AccountCreation,
    /// Password reset
    PasswordReset,
}

impl Purpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Purpose::AccountCreation => "account_creation",
            Purpose::PasswordReset => "password_reset",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "account_creation" => Some(Purpose::AccountCreation),
            "password_reset" => Some(Purpose::PasswordReset),
            _ => None,
        }
    }

    /// Subject line of the notification sent for this purpose
    pub fn subject(&self) -> &'static str {
        match self {
            Purpose::AccountCreation => "Confirmación de usuario",
            Purpose::PasswordReset => "Confirmación de blanqueo de contraseña",
        }
    }
}

/// Canonical form of an account identifier as stored and looked up
pub fn normalize_id(id: &str) -> &str {
    id.trim()
}

/// A registered account. The email address is the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub password_digest: String,
    pub must_reset_on_next_login: bool,
    pub status: AccountStatus,
    pub password_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unguessable identifier of a confirmation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationId(pub Uuid);

impl ConfirmationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConfirmationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ConfirmationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A single-use confirmation code tying an account to a pending action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationRequest {
    pub id: ConfirmationId,
    pub account_id: String,
    pub purpose: Purpose,
    pub redeemed: bool,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ConfirmationRequest {
    /// A fresh, unredeemed request
    pub fn new(account_id: impl Into<String>, purpose: Purpose) -> Self {
        Self {
            id: ConfirmationId::generate(),
            account_id: account_id.into(),
            purpose,
            redeemed: false,
            redeemed_at: None,
            created_at: Utc::now(),
        }
    }
}
