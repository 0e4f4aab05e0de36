//! Deterministic seed derivation
//!
//! recovery phrase + passphrase → BIP39 seed → HMAC-SHA512 keyed with an
//! application domain tag.
//!
//! - BIP39 step: PBKDF2-HMAC-SHA512, 2048 rounds, salt `"mnemonic" + passphrase`,
//!   both inputs NFKD-normalized. Identical to what other BIP39 consumers
//!   compute, so the phrase stays portable.
//! - Domain step: HMAC-SHA512(key = domain tag, msg = BIP39 seed). Seeds for
//!   this wallet never equal seeds derived from the same phrase elsewhere.
//!
//! The normalized phrase, salt and BIP39 seed live in `Zeroizing` buffers and
//! are wiped before this module returns.
use std::borrow::Cow;

use bip39::Mnemonic;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;
use zeroize::{Zeroize, Zeroizing};

use crate::core::errors::SeedUnavailable;
use crate::security::secret::SeedMaterial;

/// PBKDF2 rounds fixed by BIP39.
pub const BIP39_PBKDF2_ROUNDS: u32 = 2048;

/// Parse and validate a phrase: BIP39 English wordlist, checksum, 12 or 24 words.
fn parse_phrase(phrase: &str) -> Result<Mnemonic, SeedUnavailable> {
    let mnemonic = Mnemonic::parse(phrase)
        .map_err(|e| SeedUnavailable::InvalidPhrase { reason: e.to_string() })?;

    let words = mnemonic.word_count();
    if words != 12 && words != 24 {
        return Err(SeedUnavailable::InvalidPhrase {
            reason: format!("expected 12 or 24 words, got {}", words),
        });
    }
    Ok(mnemonic)
}

/// BIP39 seed for `phrase` and `passphrase`.
///
/// Exposed for interoperability checks; wallet code should use [`derive_seed`].
pub fn derive_base_seed(
    phrase: &str,
    passphrase: &str,
) -> Result<Zeroizing<[u8; 64]>, SeedUnavailable> {
    let mnemonic = parse_phrase(phrase)?;
    // Display joins the normalized words with single spaces.
    let normalized = Zeroizing::new(mnemonic.to_string());
    // the parsed word indices inside `mnemonic` are not wiped

    let mut passphrase: Cow<'_, str> = Cow::Borrowed(passphrase);
    Mnemonic::normalize_utf8_cow(&mut passphrase);

    let mut salt = Zeroizing::new(Vec::with_capacity(8 + passphrase.len()));
    salt.extend_from_slice(b"mnemonic");
    salt.extend_from_slice(passphrase.as_bytes());
    if let Cow::Owned(mut owned) = passphrase {
        owned.zeroize();
    }

    let mut base = Zeroizing::new([0u8; 64]);
    pbkdf2_hmac::<Sha512>(normalized.as_bytes(), &salt, BIP39_PBKDF2_ROUNDS, base.as_mut());
    Ok(base)
}

/// 🔐 Domain-separated wallet seed.
///
/// Returns [`SeedUnavailable`] rather than panicking when the phrase does
/// not parse, so callers can fall back to random secrets.
pub fn derive_seed(
    phrase: &str,
    passphrase: &str,
    domain_tag: &[u8],
) -> Result<SeedMaterial, SeedUnavailable> {
    if domain_tag.is_empty() {
        return Err(SeedUnavailable::InvalidDomainTag);
    }

    let base = derive_base_seed(phrase, passphrase)?;

    let mut mac = <Hmac<Sha512> as Mac>::new_from_slice(domain_tag)
        .map_err(|_| SeedUnavailable::InvalidDomainTag)?;
    mac.update(base.as_ref());
    drop(base);

    let mut tag = mac.finalize().into_bytes();
    let mut seed = Zeroizing::new([0u8; 64]);
    seed.copy_from_slice(tag.as_slice());
    tag.as_mut_slice().zeroize();

    Ok(SeedMaterial::from_array(seed))
}
