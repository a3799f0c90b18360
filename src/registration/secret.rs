//! Secret webhook handles.
//!
//! A handle is the only credential a device holds. It is 32 bytes from the
//! operating system RNG, rendered as 64 lowercase hex characters.

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Number of random bytes behind a handle (256 bits).
pub const SECRET_HANDLE_BYTES: usize = 32;

/// Unguessable bearer token issued once per registration.
///
/// `Debug` only prints a short prefix so handles do not leak into logs.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretHandle(String);

impl SecretHandle {
    /// Generate a fresh handle from the OS random source.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_HANDLE_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(6).collect();
        format!("{}…", prefix)
    }
}

impl From<&str> for SecretHandle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for SecretHandle {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretHandle({})", self.redacted())
    }
}

impl fmt::Display for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
