//! Credentials
//!
//! PINs and CVVs are only ever needed for equality checks, so they are
//! stored as salted one-way SHA-256 digests and never recoverable.

mod guard;

pub use guard::AuthenticationGuard;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::domain::DomainError;

const SALT_LEN: usize = 16;
const PIN_MIN_DIGITS: usize = 4;
const PIN_MAX_DIGITS: usize = 6;

/// A validated, supplied PIN (4 to 6 ASCII digits).
///
/// Debug output never contains the digits.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let valid_length = (PIN_MIN_DIGITS..=PIN_MAX_DIGITS).contains(&raw.len());
        if !valid_length || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::Validation(format!(
                "PIN must be {} to {} digits",
                PIN_MIN_DIGITS, PIN_MAX_DIGITS
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Pin {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pin::parse(s)
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

/// Salted digest of a secret (PIN or CVV), hex-encoded for storage.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialHash {
    salt: String,
    digest: String,
}

impl CredentialHash {
    /// Hash a secret under a fresh random salt
    pub fn derive(secret: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        Self {
            salt: hex::encode(salt),
            digest: hex::encode(Self::digest(&salt, secret)),
        }
    }

    pub fn for_pin(pin: &Pin) -> Self {
        Self::derive(pin.as_str())
    }

    /// Recompute the digest for `secret` and compare in constant time
    pub fn matches(&self, secret: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (hex::decode(&self.salt), hex::decode(&self.digest)) else {
            tracing::error!("Stored credential is not valid hex");
            return false;
        };
        constant_time_eq(&Self::digest(&salt, secret), &expected)
    }

    fn digest(salt: &[u8], secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialHash([REDACTED])")
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Generate a random three digit card verification value
pub fn generate_cvv() -> String {
    format!("{:03}", rand::thread_rng().gen_range(0..1000))
}
