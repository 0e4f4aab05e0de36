// tests/util.rs
// Shared test helpers for integration tests
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use ecash_wallet_state::security::key_provider::{KeyProvider, NotConfigured};
use ecash_wallet_state::service::{IdentityResolver, NoResolver};
use ecash_wallet_state::{LockConfig, Proof, WalletStateConfig, WalletStateEngine};
use tempfile::TempDir;

pub const PHRASE_12: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
pub const PHRASE_24: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

/// Compressed encodings of G, 2G, 3G, 4G, 5G on secp256k1.
pub const K1: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
pub const K2: &str = "02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5";
pub const K3: &str = "02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9";
pub const K4: &str = "02e493dbf1c10d80f3581e4904930b1404cc6c13900ee0758474fa94abe8c4cd13";
pub const K5: &str = "022f8bde4d1a07209355b4a7250a5c5128e88b84bddc619ab7cba8d569b240efe4";

pub const MINT: &str = "https://mint.example";
pub const KEYSET: &str = "009a1f293253e41e";

/// Short timeouts so contention tests fail fast.
pub fn fast_lock() -> LockConfig {
    LockConfig { timeout_ms: 500, poll_interval_ms: 10, stale_grace_ms: 100 }
}

pub fn temp_config() -> (TempDir, WalletStateConfig) {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = WalletStateConfig::in_dir(dir.path());
    (dir, cfg)
}

pub fn engine_with(
    provider: Arc<dyn KeyProvider>,
    resolver: Arc<dyn IdentityResolver>,
) -> (TempDir, WalletStateEngine) {
    let (dir, cfg) = temp_config();
    let engine = WalletStateEngine::open(cfg, provider, resolver).expect("open engine");
    (dir, engine)
}

pub fn plain_engine() -> (TempDir, WalletStateEngine) {
    engine_with(Arc::new(NotConfigured), Arc::new(NoResolver))
}

pub fn proof(amount: u64, secret: &str) -> Proof {
    Proof::new(
        KEYSET,
        amount,
        secret,
        "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea",
    )
}

/// Path of the state_harness binary built alongside the tests.
pub fn harness_exe() -> PathBuf {
    let exe = PathBuf::from(env!("CARGO_BIN_EXE_state_harness"));
    if !exe.exists() {
        panic!("state_harness binary not found at {}", exe.display());
    }
    exe
}
