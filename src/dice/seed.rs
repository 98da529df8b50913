//! Seed generation and derivation
//!
//! Root seeds are 32 random bytes, hex encoded. Derived seeds are
//! `hex(sha256(parent || label))`: reproducible from the root seed and the
//! label alone, but unrelated to each other for distinct labels.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Bytes of entropy behind a generated seed
pub const SEED_BYTES: usize = 32;

/// Opaque seed token that, together with an expression, fixes a roll
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seed(String);

impl Seed {
    /// Wrap an existing seed string
    pub fn new(seed: impl Into<String>) -> Self {
        Self(seed.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Seed {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Seed {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Backend that supplies entropy for fresh root seeds.
///
/// Implementations must be safe to call from many threads at once.
pub trait EntropySource: Send + Sync {
    fn fill(&self, buf: &mut [u8; SEED_BYTES]);
}

/// Thread-local CSPRNG from `rand`, reseeded from the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEntropy;

impl EntropySource for SystemEntropy {
    fn fill(&self, buf: &mut [u8; SEED_BYTES]) {
        rand::rng().fill(buf);
    }
}

/// Produce a fresh root seed from the given entropy source
pub fn generate_seed(entropy: &dyn EntropySource) -> Seed {
    let mut bytes = [0u8; SEED_BYTES];
    entropy.fill(&mut bytes);
    Seed(hex::encode(bytes))
}

/// Derive a child seed from a parent seed and a context label.
///
/// Parent and label are hashed back to back with no separator.
pub fn derive_seed(parent: &Seed, label: &str) -> Seed {
    let mut hasher = Sha256::new();
    hasher.update(parent.as_str().as_bytes());
    hasher.update(label.as_bytes());
    Seed(hex::encode(hasher.finalize()))
}
