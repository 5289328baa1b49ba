//! Signed session tokens
//!
//! A token is an HS256 compact JWS (`header.claims.signature`, base64url
//! without padding) whose claims name the subject and the expiry instant.
//! Tokens are self-certifying: a token is valid iff its MAC verifies under
//! the process signing key and the current time is before `exp`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// Length of generated signing secrets in bytes
pub const SECRET_LEN: usize = 32;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (account identifier)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(subject: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: subject.into(),
            exp: expires_at.timestamp(),
        }
    }

    /// Expiry as a timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Whether the token is expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// HMAC secret used to sign and verify session tokens
#[derive(Clone)]
pub struct SigningKey {
    secret: Vec<u8>,
}

impl SigningKey {
    /// Create a key from raw secret bytes
    pub fn from_bytes(secret: &[u8]) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::MalformedToken("signing secret must not be empty".into()));
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut secret = vec![0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        Self { secret }
    }

    /// Encode the secret as base64url (no padding)
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.secret)
    }

    /// Decode a secret from base64url
    pub fn from_base64(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s.trim())
            .map_err(|e| Error::MalformedToken(format!("invalid signing secret: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Sign claims into a compact token string
    pub fn sign(&self, claims: &SessionClaims) -> Result<String> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);

        let message = format!("{}.{}", header_b64, claims_b64);
        let signature = self.mac(message.as_bytes())?.finalize().into_bytes();
        let sig_b64 = URL_SAFE_NO_PAD.encode(signature);

        Ok(format!("{}.{}", message, sig_b64))
    }

    /// Verify a token's structure and signature and return its claims.
    ///
    /// Expiry is not checked here; see [`SigningKey::verify_at`].
    pub fn verify_signature(&self, token: &str) -> Result<SessionClaims> {
        let parts: Vec<&str> = token.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(Error::MalformedToken("expected 3 JWT parts".into()));
        }

        let header: Header = decode_segment(parts[0], "header")?;
        if !header.alg.starts_with("HS") {
            return Err(Error::MalformedToken(format!(
                "unexpected signing method: {}",
                header.alg
            )));
        }
        if header.alg != ALGORITHM {
            // Same family, different digest: cannot have been signed by us
            return Err(Error::InvalidSignature);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(parts[2])
            .map_err(|e| Error::MalformedToken(format!("signature: {}", e)))?;

        let message = format!("{}.{}", parts[0], parts[1]);
        self.mac(message.as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| Error::InvalidSignature)?;

        decode_segment(parts[1], "claims")
    }

    /// Fully validate a token at the given instant
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims> {
        let claims = self.verify_signature(token)?;
        if claims.is_expired_at(now) {
            return Err(Error::Expired);
        }
        Ok(claims)
    }

    /// Fully validate a token against the current time
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        self.verify_at(token, Utc::now())
    }

    fn mac(&self, message: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Hash(format!("invalid HMAC key: {}", e)))?;
        mac.update(message);
        Ok(mac)
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey").finish_non_exhaustive()
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str, what: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| Error::MalformedToken(format!("{}: {}", what, e)))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::MalformedToken(format!("{}: {}", what, e)))
}
