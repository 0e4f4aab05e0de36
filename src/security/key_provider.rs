//! Recovery phrase sources.
//!
//! The phrase is fetched on demand for each derivation and dropped right
//! after; providers never cache it.

use tracing::debug;

use crate::core::errors::SeedUnavailable;
use crate::security::secret::RecoveryPhrase;

/// Environment variable holding the recovery phrase.
pub const ENV_MNEMONIC: &str = "ECASH_WALLET_MNEMONIC";
/// Environment variable that must be `1` before the phrase is read.
pub const ENV_ALLOW_SECRET_ACCESS: &str = "ECASH_ALLOW_SECRET_ACCESS";

/// Supplies the recovery phrase for deterministic derivation.
pub trait KeyProvider: Send + Sync {
    fn recovery_phrase(&self) -> Result<RecoveryPhrase, SeedUnavailable>;

    /// Short name for logs.
    fn describe(&self) -> &'static str;
}

/// No phrase source; the wallet runs with random secrets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotConfigured;

impl KeyProvider for NotConfigured {
    fn recovery_phrase(&self) -> Result<RecoveryPhrase, SeedUnavailable> {
        Err(SeedUnavailable::NotConfigured)
    }

    fn describe(&self) -> &'static str {
        "not-configured"
    }
}

/// Reads the phrase from `ECASH_WALLET_MNEMONIC`, gated by
/// `ECASH_ALLOW_SECRET_ACCESS=1`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvKeyProvider;

impl KeyProvider for EnvKeyProvider {
    fn recovery_phrase(&self) -> Result<RecoveryPhrase, SeedUnavailable> {
        let phrase = match std::env::var(ENV_MNEMONIC) {
            Ok(p) if !p.trim().is_empty() => p,
            _ => return Err(SeedUnavailable::NotConfigured),
        };
        if std::env::var(ENV_ALLOW_SECRET_ACCESS).ok().as_deref() != Some("1") {
            debug!("recovery phrase present but {} is not set", ENV_ALLOW_SECRET_ACCESS);
            return Err(SeedUnavailable::NotAuthorized(ENV_ALLOW_SECRET_ACCESS));
        }
        Ok(RecoveryPhrase::new(phrase))
    }

    fn describe(&self) -> &'static str {
        "env"
    }
}

/// Fixed phrase held in memory, for embedders that already unlocked one.
pub struct StaticKeyProvider {
    phrase: secrecy::SecretString,
}

impl StaticKeyProvider {
    pub fn new(phrase: impl Into<String>) -> Self {
        Self { phrase: secrecy::SecretString::new(phrase.into()) }
    }
}

impl KeyProvider for StaticKeyProvider {
    fn recovery_phrase(&self) -> Result<RecoveryPhrase, SeedUnavailable> {
        use secrecy::ExposeSecret;
        Ok(RecoveryPhrase::new(self.phrase.expose_secret().clone()))
    }

    fn describe(&self) -> &'static str {
        "static"
    }
}
