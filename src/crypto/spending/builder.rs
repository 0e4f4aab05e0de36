//! Lock descriptor construction
//!
//! Builds single-key, threshold and time-locked refund descriptors from hex
//! public keys. Signing and token assembly happen elsewhere; this module only
//! guarantees the descriptor is internally consistent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::keys::normalize_key_set;
use super::policy::ThresholdPolicy;
use crate::core::errors::{Result, WalletStateError};

/// Refund threshold applied when the caller does not set one.
pub const DEFAULT_REFUND_THRESHOLD: u32 = 1;

/// Shape of a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Exactly one key, no refund branch.
    Single,
    /// Several keys, a threshold, or a refund branch.
    Multi,
}

/// Caller input for the refund branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub pubkeys: Vec<String>,
    pub threshold: Option<u32>,
    /// Unix seconds after which the refund keys may spend.
    pub locktime: u64,
}

impl RefundRequest {
    pub fn new<S: AsRef<str>>(pubkeys: &[S], locktime: u64) -> Self {
        Self {
            pubkeys: pubkeys.iter().map(|k| k.as_ref().to_string()).collect(),
            threshold: None,
            locktime,
        }
    }

    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// Validated refund branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundSpec {
    pub pubkeys: Vec<String>,
    pub threshold: u32,
    pub locktime: u64,
}

/// Validated lock descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSpec {
    pub mode: LockMode,
    /// Normalized compressed keys, first-seen order, no duplicates.
    pub pubkeys: Vec<String>,
    pub threshold: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund: Option<RefundSpec>,
}

impl LockSpec {
    /// Key placed in the secret's `data` field.
    pub fn primary_key(&self) -> &str {
        // construction guarantees at least one key
        self.pubkeys.first().map(String::as_str).unwrap_or_default()
    }

    /// Tag list in NUT-11 layout.
    ///
    /// `pubkeys` carries the keys after [`primary_key`](Self::primary_key);
    /// `n_sigs` is emitted only when more than one signature is required.
    pub fn tags(&self) -> Vec<Vec<String>> {
        let mut tags = Vec::new();

        if self.pubkeys.len() > 1 {
            let mut tag = vec!["pubkeys".to_string()];
            tag.extend(self.pubkeys.iter().skip(1).cloned());
            tags.push(tag);
        }
        if self.threshold > 1 {
            tags.push(vec!["n_sigs".to_string(), self.threshold.to_string()]);
        }
        if let Some(refund) = &self.refund {
            tags.push(vec!["locktime".to_string(), refund.locktime.to_string()]);
            let mut tag = vec!["refund".to_string()];
            tag.extend(refund.pubkeys.iter().cloned());
            tags.push(tag);
            if refund.threshold > 1 {
                tags.push(vec!["n_sigs_refund".to_string(), refund.threshold.to_string()]);
            }
        }
        tags
    }

    pub fn is_time_locked(&self) -> bool {
        self.refund.is_some()
    }
}

/// Stateless lock builder.
pub struct LockBuilder;

impl LockBuilder {
    /// Build against the current wall clock.
    pub fn build<S: AsRef<str>>(
        pubkeys: &[S],
        threshold: Option<u32>,
        refund: Option<RefundRequest>,
    ) -> Result<LockSpec> {
        Self::build_at(Utc::now(), pubkeys, threshold, refund)
    }

    /// Build with an explicit "now" used for the locktime check.
    pub fn build_at<S: AsRef<str>>(
        now: DateTime<Utc>,
        pubkeys: &[S],
        threshold: Option<u32>,
        refund: Option<RefundRequest>,
    ) -> Result<LockSpec> {
        let keys = normalize_key_set(pubkeys)?;
        let policy = ThresholdPolicy::require_all_by_default(threshold, key_count(&keys)?, "main")?;

        let refund = match refund {
            Some(request) => Some(Self::refund_branch(now, request)?),
            None => None,
        };

        let mode = if keys.len() == 1 && refund.is_none() {
            LockMode::Single
        } else {
            LockMode::Multi
        };

        debug!(
            mode = ?mode,
            keys = keys.len(),
            threshold = policy.required,
            refund = refund.is_some(),
            "lock descriptor built"
        );

        Ok(LockSpec { mode, pubkeys: keys, threshold: policy.required, refund })
    }

    fn refund_branch(now: DateTime<Utc>, request: RefundRequest) -> Result<RefundSpec> {
        let now_secs = u64::try_from(now.timestamp()).unwrap_or(0);
        if request.locktime <= now_secs {
            return Err(WalletStateError::InvalidLockSpec(format!(
                "refund locktime {} is not in the future (now {})",
                request.locktime, now_secs
            )));
        }

        let keys = normalize_key_set(request.pubkeys.as_slice())?;
        let policy = ThresholdPolicy::new(
            request.threshold.unwrap_or(DEFAULT_REFUND_THRESHOLD),
            key_count(&keys)?,
            "refund",
        )?;

        Ok(RefundSpec { pubkeys: keys, threshold: policy.required, locktime: request.locktime })
    }
}

fn key_count(keys: &[String]) -> Result<u32> {
    u32::try_from(keys.len())
        .map_err(|_| WalletStateError::InvalidLockSpec(format!("too many keys: {}", keys.len())))
}
