//! Password digests and password policy
//!
//! Two schemes are provided. [`Sha256Hasher`] is a salt-less SHA-256 hex
//! digest, kept so that digests written by earlier deployments keep
//! verifying. [`BcryptHasher`] is salted and slow and should be preferred
//! for new deployments.

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Default bcrypt cost factor
pub const BCRYPT_COST: u32 = 12;

/// One-way digest of a cleartext password for storage and comparison
pub trait PasswordHasher: Send + Sync {
    /// Compute the digest to store for a cleartext password
    fn digest(&self, cleartext: &str) -> Result<String>;

    /// Check a cleartext password against a stored digest
    fn compare(&self, cleartext: &str, digest: &str) -> Result<bool>;
}

/// Salt-less SHA-256 over the raw password bytes, hex encoded
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl PasswordHasher for Sha256Hasher {
    fn digest(&self, cleartext: &str) -> Result<String> {
        Ok(hex::encode(Sha256::digest(cleartext.as_bytes())))
    }

    fn compare(&self, cleartext: &str, digest: &str) -> Result<bool> {
        let computed = self.digest(cleartext)?;
        Ok(constant_time_eq(computed.as_bytes(), digest.as_bytes()))
    }
}

/// Salted bcrypt digests
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(BCRYPT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn digest(&self, cleartext: &str) -> Result<String> {
        bcrypt::hash(cleartext, self.cost).map_err(|e| Error::Hash(e.to_string()))
    }

    fn compare(&self, cleartext: &str, digest: &str) -> Result<bool> {
        bcrypt::verify(cleartext, digest).map_err(|e| Error::Hash(e.to_string()))
    }
}

/// Which digest scheme to use for stored passwords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    #[default]
    Sha256,
    Bcrypt,
}

impl HashScheme {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Some(HashScheme::Sha256),
            "bcrypt" => Some(HashScheme::Bcrypt),
            _ => None,
        }
    }

    /// Build the hasher for this scheme
    pub fn hasher(self) -> Box<dyn PasswordHasher> {
        match self {
            HashScheme::Sha256 => Box::new(Sha256Hasher),
            HashScheme::Bcrypt => Box::new(BcryptHasher::default()),
        }
    }
}

/// Length limits applied to new passwords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 1,
            max_length: 40,
        }
    }
}

impl PasswordPolicy {
    /// Check a candidate password. Lengths are counted in characters.
    pub fn check(&self, cleartext: &str) -> Result<()> {
        let len = cleartext.chars().count();
        if len < self.min_length {
            return Err(Error::PasswordPolicy(format!(
                "password too short (minimum {} characters)",
                self.min_length
            )));
        }
        if self.max_length > 0 && len > self.max_length {
            return Err(Error::PasswordPolicy(format!(
                "password too long (maximum {} characters)",
                self.max_length
            )));
        }
        Ok(())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
