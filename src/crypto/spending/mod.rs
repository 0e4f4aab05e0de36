//! Spending conditions
//!
//! Key normalization, threshold validation and lock descriptor building.

pub mod builder;
pub mod keys;
pub mod policy;

pub use builder::{LockBuilder, LockMode, LockSpec, RefundRequest, RefundSpec};
pub use keys::normalize_key;
pub use policy::ThresholdPolicy;
