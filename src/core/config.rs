use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::errors::{Result, WalletStateError};

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "ECASH_WALLET_DIR";
/// Environment variable overriding the lock timeout (milliseconds).
pub const ENV_LOCK_TIMEOUT_MS: &str = "ECASH_LOCK_TIMEOUT_MS";

/// Default domain tag for seed derivation.
pub const DEFAULT_SEED_DOMAIN_TAG: &str = "ecash-wallet/seed/v1";

/// Lock acquisition configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    /// Give up after this many milliseconds
    #[serde(default = "LockConfig::default_timeout_ms")]
    pub timeout_ms: u64,

    /// Sleep between attempts (milliseconds)
    #[serde(default = "LockConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// A marker without a readable pid is treated as stale after this age (milliseconds)
    #[serde(default = "LockConfig::default_stale_grace_ms")]
    pub stale_grace_ms: u64,
}

impl LockConfig {
    fn default_timeout_ms() -> u64 { 5_000 }
    fn default_poll_interval_ms() -> u64 { 50 }
    fn default_stale_grace_ms() -> u64 { 2_000 }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_grace(&self) -> Duration {
        Duration::from_millis(self.stale_grace_ms)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Self::default_timeout_ms(),
            poll_interval_ms: Self::default_poll_interval_ms(),
            stale_grace_ms: Self::default_stale_grace_ms(),
        }
    }
}

/// Wallet state configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStateConfig {
    /// Directory holding the proof store, counter store and their lock markers
    #[serde(default = "WalletStateConfig::default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "WalletStateConfig::default_proof_file")]
    pub proof_file: String,

    #[serde(default = "WalletStateConfig::default_counter_file")]
    pub counter_file: String,

    #[serde(default)]
    pub lock: LockConfig,

    /// HMAC key separating this wallet's seed from other uses of the same phrase
    #[serde(default = "WalletStateConfig::default_seed_domain_tag")]
    pub seed_domain_tag: String,
}

impl WalletStateConfig {
    fn default_data_dir() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ecash-wallet")
    }
    fn default_proof_file() -> String { "proofs.json".to_string() }
    fn default_counter_file() -> String { "counters.json".to_string() }
    fn default_seed_domain_tag() -> String { DEFAULT_SEED_DOMAIN_TAG.to_string() }

    /// Configuration rooted at `data_dir`, everything else default.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into(), ..Self::default() }
    }

    /// Defaults overlaid with `ECASH_WALLET_DIR` and `ECASH_LOCK_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(dir) = std::env::var_os(ENV_DATA_DIR) {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = std::env::var(ENV_LOCK_TIMEOUT_MS) {
            cfg.lock.timeout_ms = raw.trim().parse().map_err(|e| {
                WalletStateError::Config(format!("invalid {}: {}", ENV_LOCK_TIMEOUT_MS, e))
            })?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lock.timeout_ms == 0 {
            return Err(WalletStateError::Config("lock timeout must be positive".into()));
        }
        if self.lock.poll_interval_ms == 0 {
            return Err(WalletStateError::Config("lock poll interval must be positive".into()));
        }
        if self.seed_domain_tag.is_empty() {
            return Err(WalletStateError::Config("seed domain tag must not be empty".into()));
        }
        if self.proof_file.is_empty() || self.counter_file.is_empty() {
            return Err(WalletStateError::Config("store file names must not be empty".into()));
        }
        if self.proof_file == self.counter_file {
            return Err(WalletStateError::Config(
                "proof store and counter store must use different files".into(),
            ));
        }
        Ok(())
    }

    pub fn proof_path(&self) -> PathBuf {
        self.data_dir.join(&self.proof_file)
    }

    pub fn counter_path(&self) -> PathBuf {
        self.data_dir.join(&self.counter_file)
    }
}

impl Default for WalletStateConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            proof_file: Self::default_proof_file(),
            counter_file: Self::default_counter_file(),
            lock: LockConfig::default(),
            seed_domain_tag: Self::default_seed_domain_tag(),
        }
    }
}
