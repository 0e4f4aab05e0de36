pub mod identity;
pub mod wallet_state;

pub use identity::{IdentityResolver, NoResolver, StaticResolver};
pub use wallet_state::{SessionContext, SessionSeed, WalletStateEngine};
