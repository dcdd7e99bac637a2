use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Length of the random nonce mixed into every transaction id.
const NONCE_LEN: usize = 24;

/// Identifier of one ledger transaction.
///
/// Derived with BLAKE3 over a fresh random nonce and the creator identity,
/// rendered as 64 lowercase hex characters. Every proposal gets its own id,
/// so a retried write never reuses the id of a failed attempt.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    /// Mint a new id for the given creator using a random nonce.
    pub fn generate(creator: &str) -> Self {
        let mut nonce = [0u8; NONCE_LEN];
        rand::Rng::fill(&mut rand::thread_rng(), &mut nonce);
        Self::derive(&nonce, creator)
    }

    /// Deterministically derive an id from a nonce and a creator.
    pub fn derive(nonce: &[u8], creator: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"chronicle-txid-v1:");
        hasher.update(nonce);
        hasher.update(b":");
        hasher.update(creator.as_bytes());
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    /// Parse an id from its 64-character hex form.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 64,
                actual: s.len(),
            });
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Full hex representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for log lines. Shorter ids are returned whole.
    pub fn short_id(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.short_id())
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TransactionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
