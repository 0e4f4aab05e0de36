pub mod secure_derivation; // 🔐 Secure seed derivation
pub mod spending;

pub use self::secure_derivation::{derive_base_seed, derive_seed};
pub use self::spending::{LockBuilder, LockMode, LockSpec, RefundRequest, RefundSpec};
