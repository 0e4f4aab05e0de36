//! Error types for the wallet state core.

use std::path::PathBuf;

use thiserror::Error;

/// Why deterministic secret derivation cannot run for this operation.
///
/// This is not a failure of the wallet: callers fall back to random
/// secrets when they see it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedUnavailable {
    /// No recovery phrase source is configured.
    #[error("no recovery phrase configured")]
    NotConfigured,
    /// A phrase source exists but access was not authorized for this process.
    #[error("recovery phrase access not authorized (set {0}=1)")]
    NotAuthorized(&'static str),
    /// The phrase could not be parsed as a 12 or 24 word BIP39 mnemonic.
    #[error("recovery phrase rejected: {reason}")]
    InvalidPhrase { reason: String },
    /// The domain tag is empty.
    #[error("seed domain tag must not be empty")]
    InvalidDomainTag,
}

/// Error type for every fallible wallet state operation.
#[derive(Debug, Error)]
pub enum WalletStateError {
    /// Deterministic mode is unavailable.
    #[error("Secret unavailable: {0}")]
    SecretUnavailable(#[from] SeedUnavailable),

    /// Another process held the lock for longer than the configured bound.
    #[error("Lock timeout: {path} still held after {waited_ms} ms")]
    LockTimeout { path: PathBuf, waited_ms: u64 },

    /// A persisted store could not be parsed.
    #[error("Malformed store {path}: {reason}")]
    MalformedStore { path: PathBuf, reason: String },

    /// Threshold, locktime or key validation failed.
    #[error("Invalid lock spec: {0}")]
    InvalidLockSpec(String),

    /// A proof failed basic validation before storage.
    #[error("Invalid proof: {0}")]
    InvalidProof(String),

    /// Reserving more indices would overflow the counter.
    #[error("Counter overflow for keyset {keyset_id}")]
    CounterOverflow { keyset_id: String },

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Identity resolution errors.
    #[error("Identity resolution error: {0}")]
    Identity(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, WalletStateError>;

impl WalletStateError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }

    /// Whether the error indicates damaged local state or I/O trouble.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::MalformedStore { .. } | Self::Io(_) | Self::CounterOverflow { .. }
        )
    }

    /// Whether callers should fall back to non-deterministic operation.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::SecretUnavailable(_))
    }
}
