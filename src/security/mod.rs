// src/security/mod.rs
//! Secret handling for the wallet state core
//!
//! Holders that zeroize on drop, log redaction helpers and the
//! recovery phrase providers.

pub mod key_provider;
pub mod secret;

pub use key_provider::{EnvKeyProvider, KeyProvider, NotConfigured, StaticKeyProvider};
pub use secret::{RecoveryPhrase, SeedMaterial};

// Redaction helpers to avoid accidental secret prints
pub mod redaction;
pub use redaction::{redact_body, secret_label};
