//! Stateless session tokens
//!
//! Tokens are signed with the process signing key and carry their own
//! expiry; nothing is stored server side. Consequently logout cannot
//! invalidate a copy of an unexpired token that a client chooses to keep:
//! it only hands the client an already-expired token to overwrite its own.
//!
//! This component never touches passwords.

use accounts_core::{SessionClaims, SigningKey};
use chrono::{DateTime, Duration, Utc};

use crate::error::BrokerError;

/// Default session length
pub const DEFAULT_SESSION_MINUTES: i64 = 30;

/// A signed token together with its subject and expiry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub value: String,
    /// Account identifier; empty for revoked tokens
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionManager {
    key: SigningKey,
    duration: Duration,
}

impl SessionManager {
    pub fn new(key: SigningKey, duration: Duration) -> Self {
        Self { key, duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Mint a token for `subject` valid for the session duration
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, BrokerError> {
        self.issue_at(subject, Utc::now())
    }

    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<IssuedToken, BrokerError> {
        let expires_at = now.checked_add_signed(self.duration).ok_or_else(|| {
            BrokerError::Internal(format!("session expiry out of range: {}", self.duration))
        })?;
        self.sign(subject, expires_at)
    }

    /// Check a token and return its subject
    pub fn validate(&self, token: &str) -> Result<String, BrokerError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, BrokerError> {
        let claims = self.key.verify_at(token, now)?;
        Ok(claims.sub)
    }

    /// Validate and reissue for the same subject (sliding expiration)
    pub fn refresh(&self, token: &str) -> Result<IssuedToken, BrokerError> {
        let now = Utc::now();
        let subject = self.validate_at(token, now)?;
        self.issue_at(&subject, now)
    }

    /// Mint an already-expired token for the client to overwrite its own with
    pub fn revoke(&self) -> Result<IssuedToken, BrokerError> {
        self.sign("", DateTime::UNIX_EPOCH)
    }

    /// Who is calling, without extending the session
    pub fn extract_subject(&self, token: &str) -> Result<String, BrokerError> {
        self.validate(token)
    }

    fn sign(&self, subject: &str, expires_at: DateTime<Utc>) -> Result<IssuedToken, BrokerError> {
        let claims = SessionClaims::new(subject, expires_at);
        let value = self.key.sign(&claims)?;
        Ok(IssuedToken {
            value,
            expires_at: claims.expires_at(),
            subject: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(SigningKey::generate(), Duration::minutes(DEFAULT_SESSION_MINUTES))
    }

    #[test]
    fn test_issue_then_validate() {
        let sessions = manager();
        let before = Utc::now();
        let token = sessions.issue("a@x.com").unwrap();

        assert_eq!(sessions.validate(&token.value).unwrap(), "a@x.com");

        let lifetime = token.expires_at - before;
        assert!(lifetime <= Duration::minutes(30) + Duration::seconds(1));
        assert!(lifetime >= Duration::minutes(30) - Duration::seconds(2));
    }

    #[test]
    fn test_expired_token_rejected() {
        let sessions = manager();
        let now = Utc::now();
        let token = sessions
            .sign("a@x.com", now - Duration::seconds(1))
            .unwrap();

        assert!(matches!(
            sessions.validate_at(&token.value, now),
            Err(BrokerError::Expired)
        ));
    }

    #[test]
    fn test_other_key_rejected() {
        let sessions = manager();
        let token = manager().issue("a@x.com").unwrap();

        assert!(matches!(
            sessions.validate(&token.value),
            Err(BrokerError::InvalidSignature)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let sessions = manager();
        assert!(matches!(
            sessions.validate("not-a-token"),
            Err(BrokerError::MalformedToken(_))
        ));
        assert!(matches!(
            sessions.validate("a.b.c"),
            Err(BrokerError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_refresh_extends_expiry() {
        let sessions = manager();
        let now = Utc::now();
        let short = sessions.sign("a@x.com", now + Duration::minutes(1)).unwrap();

        let refreshed = sessions.refresh(&short.value).unwrap();
        assert!(refreshed.expires_at > short.expires_at);
        assert_eq!(refreshed.subject, "a@x.com");
        assert_eq!(sessions.extract_subject(&refreshed.value).unwrap(), "a@x.com");
    }

    #[test]
    fn test_refresh_rejects_expired() {
        let sessions = manager();
        let stale = sessions
            .sign("a@x.com", Utc::now() - Duration::seconds(1))
            .unwrap();

        assert!(matches!(
            sessions.refresh(&stale.value),
            Err(BrokerError::Expired)
        ));
    }

    #[test]
    fn test_unrepresentable_expiry_is_an_error() {
        let huge = Duration::try_minutes(1_000_000_000_000).unwrap();
        let sessions = SessionManager::new(SigningKey::generate(), huge);

        assert!(matches!(
            sessions.issue("a@x.com"),
            Err(BrokerError::Internal(_))
        ));
    }

    #[test]
    fn test_revoked_token_is_expired() {
        let sessions = manager();
        let revoked = sessions.revoke().unwrap();

        assert!(revoked.expires_at < Utc::now());
        assert!(matches!(
            sessions.validate(&revoked.value),
            Err(BrokerError::Expired)
        ));
    }
}
