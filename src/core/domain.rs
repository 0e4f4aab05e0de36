//! Domain records persisted by the wallet state stores.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A bearer proof held by the wallet.
///
/// The on-disk format uses the Cashu wire names `id` and `C` rather than
/// `mintKeysetId` and `unblindedSignature`, so stored proofs can be handed
/// to other Cashu tooling as-is. The descriptive names are still accepted
/// on read.
/// Fields this crate does not interpret (`witness`, `dleq`, ...) are kept
/// in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proof {
    /// Keyset of the mint that signed this proof
    #[serde(rename = "id", alias = "mintKeysetId")]
    pub keyset_id: String,
    /// Denomination, a positive power of two
    pub amount: u64,
    /// Opaque secret; may encode a spending condition. Dedup key in the store.
    pub secret: String,
    /// Unblinded mint signature
    #[serde(rename = "C", alias = "unblindedSignature", alias = "c")]
    pub c: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Proof {
    pub fn new(
        keyset_id: impl Into<String>,
        amount: u64,
        secret: impl Into<String>,
        c: impl Into<String>,
    ) -> Self {
        Self {
            keyset_id: keyset_id.into(),
            amount,
            secret: secret.into(),
            c: c.into(),
            extra: Map::new(),
        }
    }

    /// Whether `amount` is a non-zero power of two.
    pub fn has_standard_denomination(&self) -> bool {
        self.amount.is_power_of_two()
    }
}

/// Sum of amounts, saturating rather than wrapping.
pub fn total_amount<'a, I>(proofs: I) -> u64
where
    I: IntoIterator<Item = &'a Proof>,
{
    proofs.into_iter().fold(0u64, |acc, p| acc.saturating_add(p.amount))
}

/// Next derivation index for one keyset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysetCounter {
    pub keyset_id: String,
    pub next_index: u64,
}

/// Proofs currently held for a mint together with their balance.
#[derive(Debug, Clone, PartialEq)]
pub struct MintState {
    pub mint_url: String,
    pub proofs: Vec<Proof>,
    pub balance: u64,
}
