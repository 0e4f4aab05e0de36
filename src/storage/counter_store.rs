//! Per-keyset derivation counters.
//!
//! File format: `{"<keysetId>": nextIndex}`. Counters only move forward;
//! `reserve` hands out disjoint index ranges to concurrent processes and
//! `advance` records indices consumed elsewhere.

use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::file_lock::{lock_path_for, with_lock};
use super::json_file::JsonFile;
use crate::core::config::LockConfig;
use crate::core::domain::KeysetCounter;
use crate::core::errors::{Result, WalletStateError};

/// Persisted counter document.
pub type CounterMap = BTreeMap<String, u64>;

#[derive(Debug, Clone)]
pub struct CounterStore {
    file: JsonFile,
    lock_path: PathBuf,
    lock: LockConfig,
}

impl CounterStore {
    pub fn new(path: impl Into<PathBuf>, lock: LockConfig) -> Result<Self> {
        let path = path.into();
        let lock_path = lock_path_for(&path)?;
        Ok(Self { file: JsonFile::new(path), lock_path, lock })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// All counters. Missing or malformed files read as empty.
    pub fn load(&self) -> Result<CounterMap> {
        self.file.read()
    }

    /// Next unused index for `keyset_id` (0 when unknown).
    pub fn get(&self, keyset_id: &str) -> Result<u64> {
        Ok(self.load()?.get(keyset_id).copied().unwrap_or(0))
    }

    /// Reserve `count` consecutive indices.
    ///
    /// Concurrent callers, in this or other processes, always receive
    /// disjoint ranges. `count == 0` returns an empty range and writes nothing.
    pub fn reserve(&self, keyset_id: &str, count: u64) -> Result<Range<u64>> {
        if count == 0 {
            let current = self.get(keyset_id)?;
            return Ok(current..current);
        }

        let range = with_lock(&self.lock_path, &self.lock, || {
            self.file.update(|counters: &mut CounterMap| {
                let current = counters.get(keyset_id).copied().unwrap_or(0);
                let next = current.checked_add(count).ok_or_else(|| {
                    WalletStateError::CounterOverflow { keyset_id: keyset_id.to_string() }
                })?;
                counters.insert(keyset_id.to_string(), next);
                Ok(current..next)
            })
        })?;

        debug!(keyset = keyset_id, start = range.start, end = range.end, "derivation range reserved");
        Ok(range)
    }

    /// Raise the counter to `candidate` if that is higher; returns the stored value.
    ///
    /// Lower candidates leave the counter untouched.
    pub fn advance(&self, keyset_id: &str, candidate: u64) -> Result<u64> {
        with_lock(&self.lock_path, &self.lock, || {
            self.file.update(|counters: &mut CounterMap| {
                let current = counters.get(keyset_id).copied().unwrap_or(0);
                if candidate > current {
                    counters.insert(keyset_id.to_string(), candidate);
                    debug!(keyset = keyset_id, from = current, to = candidate, "counter advanced");
                    Ok(candidate)
                } else {
                    debug!(keyset = keyset_id, current, candidate, "ignoring counter rewind");
                    Ok(current)
                }
            })
        })
    }

    /// All counters as records, ordered by keyset id.
    pub fn snapshot(&self) -> Result<Vec<KeysetCounter>> {
        Ok(self
            .load()?
            .into_iter()
            .map(|(keyset_id, next_index)| KeysetCounter { keyset_id, next_index })
            .collect())
    }

    /// Merge a snapshot: each counter becomes `max(stored, snapshot)`.
    pub fn restore(&self, snapshot: &[KeysetCounter]) -> Result<()> {
        let raised = with_lock(&self.lock_path, &self.lock, || {
            self.file.update(|counters: &mut CounterMap| {
                let mut raised = 0usize;
                for entry in snapshot {
                    let slot = counters.entry(entry.keyset_id.clone()).or_insert(0);
                    if entry.next_index > *slot {
                        *slot = entry.next_index;
                        raised += 1;
                    }
                }
                Ok(raised)
            })
        })?;
        info!(entries = snapshot.len(), raised, "counter snapshot restored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CounterStore {
        CounterStore::new(dir.path().join("counters.json"), LockConfig::default()).unwrap()
    }

    #[test]
    fn test_reserve_sequence() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        assert_eq!(s.reserve("k", 10).unwrap(), 0..10);
        assert_eq!(s.get("k").unwrap(), 10);
        assert_eq!(s.reserve("k", 5).unwrap(), 10..15);
        assert_eq!(s.get("other").unwrap(), 0);
    }

    #[test]
    fn test_reserve_zero_does_not_write() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        assert_eq!(s.reserve("k", 0).unwrap(), 0..0);
        assert!(!s.path().exists());
    }

    #[test]
    fn test_reserve_overflow() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.advance("k", u64::MAX - 1).unwrap();
        assert!(matches!(s.reserve("k", 2), Err(WalletStateError::CounterOverflow { .. })));
        assert_eq!(s.get("k").unwrap(), u64::MAX - 1);
    }

    #[test]
    fn test_advance_never_rewinds() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        assert_eq!(s.advance("k", 7).unwrap(), 7);
        assert_eq!(s.advance("k", 3).unwrap(), 7);
        assert_eq!(s.get("k").unwrap(), 7);
    }

    #[test]
    fn test_snapshot_restore_merges() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.advance("a", 5).unwrap();
        s.advance("b", 9).unwrap();

        s.restore(&[
            KeysetCounter { keyset_id: "a".into(), next_index: 8 },
            KeysetCounter { keyset_id: "b".into(), next_index: 2 },
            KeysetCounter { keyset_id: "c".into(), next_index: 1 },
        ])
        .unwrap();

        let snap = s.snapshot().unwrap();
        assert_eq!(
            snap,
            vec![
                KeysetCounter { keyset_id: "a".into(), next_index: 8 },
                KeysetCounter { keyset_id: "b".into(), next_index: 9 },
                KeysetCounter { keyset_id: "c".into(), next_index: 1 },
            ]
        );
    }

    #[test]
    fn test_file_format() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        s.reserve("009a1f293253e41e", 3).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(s.path()).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"009a1f293253e41e": 3}));
    }
}
