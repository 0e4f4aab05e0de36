//! Secret holders for the recovery phrase and derived seed material.
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use zeroize::Zeroizing;

/// A recovery phrase as handed over by the secret-management facility.
///
/// Never serialized; `Debug` only reveals the word count.
pub struct RecoveryPhrase(SecretString);

impl RecoveryPhrase {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self(SecretString::new(phrase.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn word_count(&self) -> usize {
        self.expose().split_whitespace().count()
    }
}

impl fmt::Debug for RecoveryPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoveryPhrase(<redacted words={}>)", self.word_count())
    }
}

/// 64 bytes of domain-separated seed, wiped on drop.
pub struct SeedMaterial(Zeroizing<[u8; 64]>);

impl SeedMaterial {
    pub const LEN: usize = 64;

    pub(crate) fn from_array(bytes: Zeroizing<[u8; 64]>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

// SeedMaterial deliberately has no Clone.
impl fmt::Debug for SeedMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeedMaterial(<redacted>)")
    }
}
