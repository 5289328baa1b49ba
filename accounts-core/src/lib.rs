//! Accounts Core Library
//!
//! Building blocks for the account and session service:
//! - Password digests for storage and comparison
//! - Signed, self-expiring session tokens (HS256 compact JWS)
//! - Confirmation mail templates carrying a confirmation link

pub mod error;
pub mod password;
pub mod template;
pub mod token;

pub use error::Error;
pub use password::{BcryptHasher, HashScheme, PasswordHasher, PasswordPolicy, Sha256Hasher};
pub use template::ConfirmationTemplate;
pub use token::{SessionClaims, SigningKey};

/// Result type for accounts-core operations
pub type Result<T> = std::result::Result<T, Error>;
