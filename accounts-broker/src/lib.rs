//! Accounts broker
//!
//! Owns account registration, email confirmation, password reset and
//! stateless cookie sessions, served as a small JSON API.

pub mod accounts;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod notifier;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;

pub use accounts::AccountService;
pub use config::{load_or_generate_signing_key, Config};
pub use confirmation::{ConfirmationWorkflow, Notice};
pub use error::BrokerError;
pub use notifier::{ConsoleNotifier, Notifier, SmtpConfig, SmtpNotifier};
pub use session::{IssuedToken, SessionManager};
pub use state::AppState;
pub use store::{AccountRepo, AccountStore, InMemoryAccountStore, SqliteStore};
