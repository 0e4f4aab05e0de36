// src/lib.rs
//! Private state core of an ecash wallet: deterministic seed derivation,
//! cross-process safe proof and counter stores, and spending-condition
//! (lock) construction.

pub mod core;
pub mod crypto;
pub mod security;
pub mod service;
pub mod storage;

pub use crate::core::{
    KeysetCounter, LockConfig, MintState, Proof, Result, SeedUnavailable, WalletStateConfig,
    WalletStateError,
};
pub use crate::crypto::{derive_seed, LockBuilder, LockMode, LockSpec, RefundRequest};
pub use crate::service::{SessionContext, SessionSeed, WalletStateEngine};
