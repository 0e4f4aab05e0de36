//! Wallet state engine
//!
//! Facade used by the token protocol layer. Owns the two stores and the
//! injected capabilities, and turns raw capability failures into the
//! "deterministic or fallback" decision the protocol layer needs.

use std::ops::Range;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use super::identity::IdentityResolver;
use crate::core::config::WalletStateConfig;
use crate::core::domain::{total_amount, KeysetCounter, MintState, Proof};
use crate::core::errors::{Result, SeedUnavailable};
use crate::crypto::secure_derivation::derive_seed;
use crate::crypto::spending::{normalize_key, LockBuilder, LockSpec, RefundRequest};
use crate::security::key_provider::KeyProvider;
use crate::security::redaction::secret_label;
use crate::security::secret::SeedMaterial;
use crate::storage::{CounterStore, ProofStore};

/// Per-session state carried by the caller.
///
/// Replaces a process-wide "already announced" flag: the deterministic-mode
/// notice is logged once per context.
#[derive(Default)]
pub struct SessionContext {
    announced: bool,
    passphrase: Option<SecretString>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a BIP39 passphrase in addition to the recovery phrase.
    pub fn with_passphrase(passphrase: impl Into<String>) -> Self {
        Self { announced: false, passphrase: Some(SecretString::new(passphrase.into())) }
    }

    pub fn has_announced(&self) -> bool {
        self.announced
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("announced", &self.announced)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Outcome of asking for the session seed.
#[derive(Debug)]
pub enum SessionSeed {
    /// Secrets and blinding factors derive from this seed.
    Deterministic(SeedMaterial),
    /// Callers generate random secrets instead.
    Unavailable(SeedUnavailable),
}

impl SessionSeed {
    pub fn is_deterministic(&self) -> bool {
        matches!(self, Self::Deterministic(_))
    }

    pub fn seed(&self) -> Option<&SeedMaterial> {
        match self {
            Self::Deterministic(seed) => Some(seed),
            Self::Unavailable(_) => None,
        }
    }
}

pub struct WalletStateEngine {
    config: WalletStateConfig,
    counters: CounterStore,
    proofs: ProofStore,
    key_provider: Arc<dyn KeyProvider>,
    resolver: Arc<dyn IdentityResolver>,
}

impl WalletStateEngine {
    /// Validate `config` and wire the stores under its data directory.
    pub fn open(
        config: WalletStateConfig,
        key_provider: Arc<dyn KeyProvider>,
        resolver: Arc<dyn IdentityResolver>,
    ) -> Result<Self> {
        config.validate()?;
        let counters = CounterStore::new(config.counter_path(), config.lock.clone())?;
        let proofs = ProofStore::new(config.proof_path(), config.lock.clone())?;

        info!(
            data_dir = %config.data_dir.display(),
            key_provider = key_provider.describe(),
            "wallet state opened"
        );

        Ok(Self { config, counters, proofs, key_provider, resolver })
    }

    pub fn config(&self) -> &WalletStateConfig {
        &self.config
    }

    pub fn counters(&self) -> &CounterStore {
        &self.counters
    }

    pub fn proofs(&self) -> &ProofStore {
        &self.proofs
    }

    /// 🔐 Seed for this session, or the reason deterministic mode is off.
    ///
    /// Never fails: every problem maps to [`SessionSeed::Unavailable`].
    pub fn session_seed(&self, ctx: &mut SessionContext) -> SessionSeed {
        let phrase = match self.key_provider.recovery_phrase() {
            Ok(phrase) => phrase,
            Err(reason) => {
                debug!(reason = %reason, "deterministic secrets unavailable, using random secrets");
                return SessionSeed::Unavailable(reason);
            }
        };

        let passphrase = ctx.passphrase.as_ref().map(|p| p.expose_secret().as_str()).unwrap_or("");
        match derive_seed(phrase.expose(), passphrase, self.config.seed_domain_tag.as_bytes()) {
            Ok(seed) => {
                if !ctx.announced {
                    info!(
                        words = phrase.word_count(),
                        provider = self.key_provider.describe(),
                        "deterministic secret derivation active"
                    );
                    ctx.announced = true;
                }
                SessionSeed::Deterministic(seed)
            }
            Err(reason) => {
                warn!(reason = %reason, "recovery phrase rejected, using random secrets");
                SessionSeed::Unavailable(reason)
            }
        }
    }

    /// Indices the caller may use for deterministic outputs under `keyset_id`.
    pub fn reserve_derivation_range(&self, keyset_id: &str, count: u64) -> Result<Range<u64>> {
        self.counters.reserve(keyset_id, count)
    }

    /// Record that indices below `next_index` were consumed elsewhere.
    pub fn record_counter_advance(&self, keyset_id: &str, next_index: u64) -> Result<u64> {
        self.counters.advance(keyset_id, next_index)
    }

    pub fn counter_snapshot(&self) -> Result<Vec<KeysetCounter>> {
        self.counters.snapshot()
    }

    pub fn restore_counters(&self, snapshot: &[KeysetCounter]) -> Result<()> {
        self.counters.restore(snapshot)
    }

    pub fn mint_state(&self, mint_url: &str) -> Result<MintState> {
        let proofs = self.proofs.proofs_for(mint_url)?;
        let balance = total_amount(&proofs);
        Ok(MintState { mint_url: mint_url.to_string(), proofs, balance })
    }

    /// Persist the outcome of a send: `kept` becomes the mint's proof set.
    ///
    /// `sent` proofs now belong to the recipient and are never stored.
    pub fn apply_outgoing(&self, mint_url: &str, kept: Vec<Proof>, sent: &[Proof]) -> Result<()> {
        for proof in sent {
            if kept.iter().any(|k| k.secret == proof.secret) {
                warn!(
                    mint = mint_url,
                    secret = %secret_label(&proof.secret),
                    "sent proof also listed as kept"
                );
            }
        }
        let sent_amount = total_amount(sent);
        let kept_amount = total_amount(&kept);
        self.proofs.replace(mint_url, kept)?;
        info!(mint = mint_url, sent = sent_amount, kept = kept_amount, "outgoing transfer applied");
        Ok(())
    }

    /// Store freshly received or minted proofs.
    pub fn apply_incoming(&self, mint_url: &str, new: Vec<Proof>) -> Result<()> {
        self.proofs.add(mint_url, new)
    }

    pub fn build_lock<S: AsRef<str>>(
        &self,
        pubkeys: &[S],
        threshold: Option<u32>,
        refund: Option<RefundRequest>,
    ) -> Result<LockSpec> {
        LockBuilder::build(pubkeys, threshold, refund)
    }

    /// Like [`build_lock`](Self::build_lock), but recipients may be names.
    ///
    /// Entries that already parse as public keys are used as-is; everything
    /// else goes through the identity resolver. Refund keys are resolved the
    /// same way.
    pub fn build_lock_for<S: AsRef<str>>(
        &self,
        recipients: &[S],
        threshold: Option<u32>,
        refund: Option<RefundRequest>,
    ) -> Result<LockSpec> {
        let keys = self.resolve_all(recipients)?;
        let refund = match refund {
            Some(mut request) => {
                request.pubkeys = self.resolve_all(request.pubkeys.as_slice())?;
                Some(request)
            }
            None => None,
        };
        LockBuilder::build(keys.as_slice(), threshold, refund)
    }

    fn resolve_all<S: AsRef<str>>(&self, recipients: &[S]) -> Result<Vec<String>> {
        recipients
            .iter()
            .map(|r| {
                let r = r.as_ref();
                match normalize_key(r) {
                    Ok(key) => Ok(key),
                    Err(_) => {
                        debug!(recipient = r, "resolving recipient");
                        self.resolver.resolve(r)
                    }
                }
            })
            .collect()
    }
}
