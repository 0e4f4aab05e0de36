//! Threshold validation shared by the main and refund branches

use crate::core::errors::{Result, WalletStateError};

/// M-of-N requirement for one key set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdPolicy {
    /// Signatures required
    pub required: u32,
    /// Distinct keys in the set
    pub total: u32,
}

impl ThresholdPolicy {
    /// Validate `required` against `total`; `branch` names the key set in errors.
    pub fn new(required: u32, total: u32, branch: &str) -> Result<Self> {
        if total == 0 {
            return Err(WalletStateError::InvalidLockSpec(format!(
                "{} key set must not be empty",
                branch
            )));
        }
        if required == 0 {
            return Err(WalletStateError::InvalidLockSpec(format!(
                "{} threshold must be at least 1",
                branch
            )));
        }
        if required > total {
            return Err(WalletStateError::InvalidLockSpec(format!(
                "{} threshold ({}) cannot exceed number of keys ({})",
                branch, required, total
            )));
        }
        Ok(Self { required, total })
    }

    /// Threshold defaulting to "all keys" when omitted.
    pub fn require_all_by_default(required: Option<u32>, total: u32, branch: &str) -> Result<Self> {
        Self::new(required.unwrap_or(total), total, branch)
    }
}
