//! SMTP relay notifier

use std::fmt;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::Notifier;

/// Default implicit-TLS submission port
pub const DEFAULT_SMTP_PORT: u16 = 465;

/// Relay settings; loaded by `Config::from_env` from the `SMTP_*` variables
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Username and password, when the relay requires login
    pub credentials: Option<(String, String)>,
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.credentials.as_ref().map(|(user, _)| user))
            .finish_non_exhaustive()
    }
}

/// Sends notices as HTML mail through an SMTP relay
pub struct SmtpNotifier {
    transport: SmtpTransport,
    sender_alias: String,
}

impl SmtpNotifier {
    /// Connect to the relay; fails if the relay cannot be reached
    pub fn new(config: SmtpConfig, sender_alias: impl Into<String>) -> Result<Self, String> {
        let mut builder = SmtpTransport::relay(&config.host)
            .map_err(|e| format!("SMTP relay {}: {}", config.host, e))?
            .port(config.port);
        if let Some((username, password)) = config.credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }
        let transport = builder.build();

        transport
            .test_connection()
            .map_err(|e| format!("SMTP relay {} unreachable: {}", config.host, e))?;
        tracing::info!(host = %config.host, port = config.port, "SMTP relay ready");

        Ok(Self {
            transport,
            sender_alias: sender_alias.into(),
        })
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<(), String> {
        let message = Message::builder()
            .from(from.parse().map_err(|e| format!("sender {}: {}", from, e))?)
            .to(to.parse().map_err(|e| format!("recipient {}: {}", to, e))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| e.to_string())?;

        self.transport.send(&message).map_err(|e| e.to_string())?;

        tracing::info!(to = %to, subject = %subject, "Notification sent");
        Ok(())
    }

    fn sender_alias(&self) -> &str {
        &self.sender_alias
    }
}
