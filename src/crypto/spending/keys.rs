//! Public key normalization for lock descriptors.

use secp256k1::PublicKey;
use tracing::debug;

use crate::core::errors::{Result, WalletStateError};

/// Length of an SEC1 compressed public key.
pub const COMPRESSED_KEY_LEN: usize = 33;
/// Length of an x-only (BIP340 style) public key.
pub const X_ONLY_KEY_LEN: usize = 32;

/// Prefix assumed for x-only keys.
///
/// The y parity of an x-only key is unknown; `0x02` is right only for
/// even-y points. Recipients publishing x-only keys with odd y get a lock
/// they cannot satisfy. Callers that can obtain the full compressed key
/// should pass it instead.
pub const ASSUMED_PARITY_PREFIX: u8 = 0x02;

/// Normalize a hex public key to lower-case compressed form.
///
/// - 33 bytes: validated on the curve and returned unchanged (lower-cased).
/// - 32 bytes: prefixed with [`ASSUMED_PARITY_PREFIX`], then validated.
pub fn normalize_key(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let bytes = hex::decode(trimmed).map_err(|e| {
        WalletStateError::InvalidLockSpec(format!("public key is not hex ({}): {}", e, trimmed))
    })?;

    let compressed = match bytes.len() {
        COMPRESSED_KEY_LEN => bytes,
        X_ONLY_KEY_LEN => {
            debug!(key = %trimmed, "x-only key: assuming even y parity");
            let mut out = Vec::with_capacity(COMPRESSED_KEY_LEN);
            out.push(ASSUMED_PARITY_PREFIX);
            out.extend_from_slice(&bytes);
            out
        }
        n => {
            return Err(WalletStateError::InvalidLockSpec(format!(
                "expected 33-byte compressed or 32-byte x-only key, got {} bytes",
                n
            )))
        }
    };

    PublicKey::from_slice(&compressed).map_err(|e| {
        WalletStateError::InvalidLockSpec(format!("not a valid secp256k1 point ({}): {}", e, trimmed))
    })?;

    Ok(hex::encode(compressed))
}

/// Normalize every key and drop duplicates, keeping first-seen order.
pub fn normalize_key_set<S: AsRef<str>>(raw: &[S]) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for key in raw {
        let normalized = normalize_key(key.as_ref())?;
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    Ok(out)
}
