//! Outbound notification abstractions

pub mod console;
pub mod smtp;

pub use console::ConsoleNotifier;
pub use smtp::{SmtpConfig, SmtpNotifier, DEFAULT_SMTP_PORT};

/// Trait for sending notification mails
pub trait Notifier: Send + Sync {
    /// Send an HTML message
    fn send(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<(), String>;

    /// Name that appears in the From header
    fn sender_alias(&self) -> &str;
}

/// Allow using Box<dyn Notifier> as a Notifier
impl Notifier for Box<dyn Notifier> {
    fn send(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<(), String> {
        (**self).send(to, from, subject, body)
    }

    fn sender_alias(&self) -> &str {
        (**self).sender_alias()
    }
}
