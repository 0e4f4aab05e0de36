//! Recipient identity resolution.
//!
//! Turns a human-facing recipient (alias, DID, contact name) into a hex
//! public key for lock construction. Real back-ends live outside this crate.

use std::collections::HashMap;

use crate::core::errors::{Result, WalletStateError};

pub trait IdentityResolver: Send + Sync {
    /// Hex public key (33-byte compressed or 32-byte x-only) for `recipient`.
    fn resolve(&self, recipient: &str) -> Result<String>;
}

/// Resolver used when no back-end is wired in; every lookup fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolver;

impl IdentityResolver for NoResolver {
    fn resolve(&self, recipient: &str) -> Result<String> {
        Err(WalletStateError::Identity(format!(
            "no identity resolver configured, cannot resolve '{}'",
            recipient
        )))
    }
}

/// Fixed name → key table.
#[derive(Debug, Default, Clone)]
pub struct StaticResolver {
    entries: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, name: impl Into<String>, pubkey: impl Into<String>) -> Self {
        self.entries.insert(name.into(), pubkey.into());
        self
    }
}

impl IdentityResolver for StaticResolver {
    fn resolve(&self, recipient: &str) -> Result<String> {
        self.entries
            .get(recipient)
            .cloned()
            .ok_or_else(|| WalletStateError::Identity(format!("unknown recipient '{}'", recipient)))
    }
}
