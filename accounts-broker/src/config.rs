//! Broker configuration

use std::path::{Path, PathBuf};

use accounts_core::{HashScheme, PasswordPolicy, SigningKey};
use chrono::Duration;
use serde::Deserialize;

use crate::accounts::DEFAULT_PASSWORD_VALIDITY_DAYS;
use crate::error::BrokerError;
use crate::notifier::{SmtpConfig, DEFAULT_SMTP_PORT};
use crate::session::DEFAULT_SESSION_MINUTES;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port to listen on
    pub port: u16,

    /// SQLite database file; the in-memory store is used when absent
    pub database_path: Option<String>,

    /// File holding the base64 session signing secret
    pub key_file: PathBuf,

    /// Session token lifetime in minutes
    pub session_minutes: i64,

    /// Password validity in days (0 = never expires)
    pub password_validity_days: i64,

    pub password_policy: PasswordPolicy,

    pub hash_scheme: HashScheme,

    /// Refuse login until the account's email is confirmed
    pub require_confirmed_login: bool,

    /// Page that account-confirmation links lead to
    pub confirm_account_url: String,

    /// Page that password-reset links lead to
    pub confirm_reset_url: String,

    /// From header on outgoing notices
    pub sender_alias: String,

    /// SMTP relay; notices go to the console when absent
    #[serde(skip)]
    pub smtp: Option<SmtpConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            database_path: None,
            key_file: PathBuf::from("signing-key.b64"),
            session_minutes: DEFAULT_SESSION_MINUTES,
            password_validity_days: DEFAULT_PASSWORD_VALIDITY_DAYS,
            password_policy: PasswordPolicy::default(),
            hash_scheme: HashScheme::default(),
            require_confirmed_login: false,
            confirm_account_url: "http://localhost:3000/confirmar_usuario".to_string(),
            confirm_reset_url: "http://localhost:3000/confirmar_blanqueo".to_string(),
            sender_alias: "no-reply@localhost".to_string(),
            smtp: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        fn get_env(key: &str) -> Option<String> {
            std::env::var(key).ok().filter(|s| !s.is_empty())
        }

        fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
            let raw = get_env(key)?;
            match raw.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(key, value = %raw, "Ignoring unparseable setting");
                    None
                }
            }
        }

        let defaults = Self::default();

        Self {
            port: parse_env("PORT").unwrap_or(defaults.port),
            database_path: get_env("DATABASE_PATH"),
            key_file: get_env("SIGNING_KEY_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.key_file),
            session_minutes: parse_env("SESSION_MINUTES").unwrap_or(defaults.session_minutes),
            password_validity_days: parse_env("PASSWORD_VALIDITY_DAYS")
                .unwrap_or(defaults.password_validity_days),
            password_policy: PasswordPolicy {
                min_length: parse_env("PASSWORD_MIN_LENGTH")
                    .unwrap_or(defaults.password_policy.min_length),
                max_length: parse_env("PASSWORD_MAX_LENGTH")
                    .unwrap_or(defaults.password_policy.max_length),
            },
            hash_scheme: get_env("PASSWORD_HASH")
                .and_then(|s| HashScheme::from_str(&s))
                .unwrap_or(defaults.hash_scheme),
            require_confirmed_login: parse_env("REQUIRE_CONFIRMED_LOGIN")
                .unwrap_or(defaults.require_confirmed_login),
            confirm_account_url: get_env("CONFIRM_ACCOUNT_URL")
                .unwrap_or(defaults.confirm_account_url),
            confirm_reset_url: get_env("CONFIRM_RESET_URL").unwrap_or(defaults.confirm_reset_url),
            sender_alias: get_env("MAIL_SENDER_ALIAS").unwrap_or(defaults.sender_alias),
            smtp: get_env("SMTP_HOST").map(|host| SmtpConfig {
                host,
                port: parse_env("SMTP_PORT").unwrap_or(DEFAULT_SMTP_PORT),
                credentials: get_env("SMTP_USERNAME").zip(get_env("SMTP_PASSWORD")),
            }),
        }
    }

    /// Session token lifetime; must be positive
    pub fn session_duration(&self) -> Result<Duration, BrokerError> {
        if self.session_minutes <= 0 {
            return Err(BrokerError::InvalidConfig(format!(
                "SESSION_MINUTES must be positive, got {}",
                self.session_minutes
            )));
        }
        Duration::try_minutes(self.session_minutes).ok_or_else(|| {
            BrokerError::InvalidConfig(format!(
                "SESSION_MINUTES out of range: {}",
                self.session_minutes
            ))
        })
    }

    /// Password validity window; zero disables expiry
    pub fn password_validity(&self) -> Result<Duration, BrokerError> {
        if self.password_validity_days < 0 {
            return Err(BrokerError::InvalidConfig(format!(
                "PASSWORD_VALIDITY_DAYS must not be negative, got {}",
                self.password_validity_days
            )));
        }
        Duration::try_days(self.password_validity_days).ok_or_else(|| {
            BrokerError::InvalidConfig(format!(
                "PASSWORD_VALIDITY_DAYS out of range: {}",
                self.password_validity_days
            ))
        })
    }
}

/// Load the session signing key from `path`, generating and saving one if
/// the file does not exist
pub fn load_or_generate_signing_key(path: &Path) -> Result<SigningKey, BrokerError> {
    if path.exists() {
        let encoded = std::fs::read_to_string(path)
            .map_err(|e| BrokerError::Internal(format!("reading {}: {}", path.display(), e)))?;
        return Ok(SigningKey::from_base64(&encoded)?);
    }

    let key = SigningKey::generate();
    std::fs::write(path, key.to_base64())
        .map_err(|e| BrokerError::Internal(format!("writing {}: {}", path.display(), e)))?;
    tracing::info!(path = %path.display(), "Generated new session signing key");
    Ok(key)
}
