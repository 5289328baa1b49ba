//! Console-based notifier for development

use super::Notifier;

/// Notifier that prints messages to the console
pub struct ConsoleNotifier {
    sender_alias: String,
}

impl ConsoleNotifier {
    pub fn new(sender_alias: impl Into<String>) -> Self {
        Self {
            sender_alias: sender_alias.into(),
        }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new("no-reply@localhost")
    }
}

impl Notifier for ConsoleNotifier {
    fn send(&self, to: &str, from: &str, subject: &str, body: &str) -> Result<(), String> {
        println!();
        println!("========================================");
        println!("  FROM:    {}", from);
        println!("  TO:      {}", to);
        println!("  SUBJECT: {}", subject);
        println!("========================================");
        println!("{}", body);
        println!();

        tracing::info!(to = %to, subject = %subject, "Notification printed to console");

        Ok(())
    }

    fn sender_alias(&self) -> &str {
        &self.sender_alias
    }
}
