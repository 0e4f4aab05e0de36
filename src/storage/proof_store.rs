//! Proof ledger keyed by mint URL.
//!
//! File format: `{"proofs": {"<mintUrl>": [proof, ...]}}`. Every mutation is
//! a full read-modify-write under `<file>.lock`. Within one mint no two proofs
//! share a `secret`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::file_lock::{lock_path_for, with_lock};
use super::json_file::JsonFile;
use crate::core::config::LockConfig;
use crate::core::domain::{total_amount, Proof};
use crate::core::errors::{Result, WalletStateError};
use crate::security::redaction::secret_label;

/// Persisted proof document.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofFile {
    #[serde(default)]
    pub proofs: BTreeMap<String, Vec<Proof>>,
}

#[derive(Debug, Clone)]
pub struct ProofStore {
    file: JsonFile,
    lock_path: PathBuf,
    lock: LockConfig,
}

impl ProofStore {
    pub fn new(path: impl Into<PathBuf>, lock: LockConfig) -> Result<Self> {
        let path = path.into();
        let lock_path = lock_path_for(&path)?;
        Ok(Self { file: JsonFile::new(path), lock_path, lock })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Stored proofs for `mint_url`; empty when the mint is unknown.
    pub fn proofs_for(&self, mint_url: &str) -> Result<Vec<Proof>> {
        let mut doc: ProofFile = self.file.read()?;
        Ok(doc.proofs.remove(mint_url).unwrap_or_default())
    }

    /// Overwrite the proof list for `mint_url`. An empty list drops the mint.
    pub fn replace(&self, mint_url: &str, proofs: Vec<Proof>) -> Result<()> {
        reject_zero_amounts(mint_url, &proofs)?;
        let proofs = dedup_by_secret(proofs);
        let count = proofs.len();
        self.mutate(|doc| {
            if proofs.is_empty() {
                doc.proofs.remove(mint_url);
            } else {
                doc.proofs.insert(mint_url.to_string(), proofs);
            }
            Ok(())
        })?;
        debug!(mint = mint_url, count, "proofs replaced");
        Ok(())
    }

    /// Append proofs; a proof whose secret is already stored overwrites it.
    pub fn add(&self, mint_url: &str, new: Vec<Proof>) -> Result<()> {
        if new.is_empty() {
            return Ok(());
        }
        reject_zero_amounts(mint_url, &new)?;
        for proof in new.iter().filter(|p| !p.has_standard_denomination()) {
            warn!(
                mint = mint_url,
                amount = proof.amount,
                secret = %secret_label(&proof.secret),
                "proof amount is not a power of two"
            );
        }

        let added = new.len();
        let stored = self.mutate(|doc| {
            let list = doc.proofs.entry(mint_url.to_string()).or_default();
            let merged = dedup_by_secret(std::mem::take(list).into_iter().chain(new).collect());
            *list = merged;
            Ok(list.len())
        })?;
        info!(mint = mint_url, added, stored, "proofs added");
        Ok(())
    }

    /// Drop stored proofs whose secret matches any of `targets`.
    ///
    /// Returns how many proofs were removed. Other fields of `targets` are
    /// ignored.
    pub fn remove(&self, mint_url: &str, targets: &[Proof]) -> Result<usize> {
        if targets.is_empty() {
            return Ok(0);
        }
        let removed = self.mutate(|doc| {
            let Some(list) = doc.proofs.get_mut(mint_url) else {
                return Ok(0);
            };
            let before = list.len();
            list.retain(|p| !targets.iter().any(|t| t.secret == p.secret));
            let removed = before - list.len();
            if list.is_empty() {
                doc.proofs.remove(mint_url);
            }
            Ok(removed)
        })?;
        debug!(mint = mint_url, removed, "proofs removed");
        Ok(removed)
    }

    /// Sum of stored amounts for `mint_url`.
    pub fn balance(&self, mint_url: &str) -> Result<u64> {
        Ok(total_amount(&self.proofs_for(mint_url)?))
    }

    /// Mints with at least one stored proof.
    pub fn mints(&self) -> Result<Vec<String>> {
        let doc: ProofFile = self.file.read()?;
        Ok(doc
            .proofs
            .into_iter()
            .filter(|(_, proofs)| !proofs.is_empty())
            .map(|(mint, _)| mint)
            .collect())
    }

    pub fn total_balance(&self) -> Result<u64> {
        let doc: ProofFile = self.file.read()?;
        Ok(doc.proofs.values().fold(0u64, |acc, proofs| acc.saturating_add(total_amount(proofs))))
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut ProofFile) -> Result<R>) -> Result<R> {
        with_lock(&self.lock_path, &self.lock, || self.file.update(f))
    }
}

/// Keep one proof per secret: first position, last value.
fn dedup_by_secret(proofs: Vec<Proof>) -> Vec<Proof> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(proofs.len());
    let mut out: Vec<Proof> = Vec::with_capacity(proofs.len());
    for proof in proofs {
        match index.get(&proof.secret) {
            Some(&i) => out[i] = proof,
            None => {
                index.insert(proof.secret.clone(), out.len());
                out.push(proof);
            }
        }
    }
    out
}

fn reject_zero_amounts(mint_url: &str, proofs: &[Proof]) -> Result<()> {
    match proofs.iter().find(|p| p.amount == 0) {
        Some(p) => Err(WalletStateError::InvalidProof(format!(
            "zero amount for mint {} (secret {})",
            mint_url,
            secret_label(&p.secret)
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MINT: &str = "https://mint.example";

    fn store(dir: &TempDir) -> ProofStore {
        ProofStore::new(dir.path().join("proofs.json"), LockConfig::default()).unwrap()
    }

    fn proof(amount: u64, secret: &str) -> Proof {
        Proof::new("009a1f293253e41e", amount, secret, "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea")
    }

    #[test]
    fn test_add_and_balance() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.add(MINT, vec![proof(1, "a"), proof(2, "b"), proof(4, "c")]).unwrap();
        assert_eq!(s.balance(MINT).unwrap(), 7);
        assert_eq!(s.mints().unwrap(), vec![MINT.to_string()]);
    }

    #[test]
    fn test_zero_amount_is_rejected() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.add(MINT, vec![proof(4, "a")]).unwrap();

        let res = s.add(MINT, vec![proof(2, "b"), proof(0, "z")]);
        assert!(matches!(res, Err(WalletStateError::InvalidProof(_))));
        let res = s.replace(MINT, vec![proof(0, "z")]);
        assert!(matches!(res, Err(WalletStateError::InvalidProof(_))));

        assert_eq!(s.balance(MINT).unwrap(), 4);
        assert_eq!(s.proofs_for(MINT).unwrap().len(), 1);
    }

    #[test]
    fn test_add_dedups_last_wins() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.add(MINT, vec![proof(1, "a"), proof(2, "b")]).unwrap();
        let mut updated = proof(1, "a");
        updated.c = "02ffff".into();
        s.add(MINT, vec![updated.clone()]).unwrap();

        let stored = s.proofs_for(MINT).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0], updated);
    }

    #[test]
    fn test_remove_matches_secret_only() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.add(MINT, vec![proof(1, "a"), proof(2, "b")]).unwrap();

        // different amount and signature, same secret
        let target = Proof::new("other", 64, "a", "02dead");
        assert_eq!(s.remove(MINT, &[target]).unwrap(), 1);
        assert_eq!(s.proofs_for(MINT).unwrap(), vec![proof(2, "b")]);
        assert_eq!(s.remove(MINT, &[proof(1, "zzz")]).unwrap(), 0);
    }

    #[test]
    fn test_replace_with_empty_drops_mint() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.add(MINT, vec![proof(8, "a")]).unwrap();
        s.replace(MINT, Vec::new()).unwrap();
        assert!(s.mints().unwrap().is_empty());
        assert_eq!(s.total_balance().unwrap(), 0);
    }

    #[test]
    fn test_mints_are_independent() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.add(MINT, vec![proof(1, "a")]).unwrap();
        s.add("https://other.example", vec![proof(16, "a")]).unwrap();
        assert_eq!(s.balance(MINT).unwrap(), 1);
        assert_eq!(s.total_balance().unwrap(), 17);
    }

    #[test]
    fn test_dedup_keeps_first_position() {
        let out = dedup_by_secret(vec![proof(1, "a"), proof(2, "b"), proof(4, "a")]);
        assert_eq!(out, vec![proof(4, "a"), proof(2, "b")]);
    }
}
