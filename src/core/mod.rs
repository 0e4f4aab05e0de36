pub mod config;
pub mod domain;
pub mod errors;

pub use config::{LockConfig, WalletStateConfig};
pub use domain::{KeysetCounter, MintState, Proof};
pub use errors::{Result, SeedUnavailable, WalletStateError};
