mod util;

use std::collections::BTreeSet;

use ecash_wallet_state::storage::ProofStore;
use ecash_wallet_state::LockConfig;
use pretty_assertions::assert_eq;
use util::{proof, MINT};

fn store(dir: &tempfile::TempDir) -> ProofStore {
    ProofStore::new(dir.path().join("proofs.json"), LockConfig::default()).unwrap()
}

fn secrets(store: &ProofStore, mint: &str) -> BTreeSet<String> {
    store.proofs_for(mint).unwrap().into_iter().map(|p| p.secret).collect()
}

#[test]
fn add_powers_of_two_gives_balance() {
    let dir = tempfile::tempdir().unwrap();
    let s = store(&dir);
    s.add("https://m", vec![proof(1, "a"), proof(2, "b"), proof(4, "c")]).unwrap();
    assert_eq!(s.balance("https://m").unwrap(), 7);
}

#[test]
fn replace_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let s = store(&dir);
    s.add(MINT, vec![proof(64, "old")]).unwrap();

    let fresh = vec![proof(8, "x"), proof(16, "y"), proof(1, "z")];
    s.replace(MINT, fresh.clone()).unwrap();

    let mut got = s.proofs_for(MINT).unwrap();
    let mut want = fresh;
    got.sort_by(|a, b| a.secret.cmp(&b.secret));
    want.sort_by(|a, b| a.secret.cmp(&b.secret));
    assert_eq!(got, want);
}

#[test]
fn remove_ignores_everything_but_secret() {
    let dir = tempfile::tempdir().unwrap();
    let s = store(&dir);
    s.add(MINT, vec![proof(1, "a"), proof(2, "b"), proof(4, "c")]).unwrap();

    let mut lookalike = proof(2, "zz");
    lookalike.c = proof(2, "b").c;
    assert_eq!(s.remove(MINT, &[lookalike]).unwrap(), 0);

    let mut same_secret = proof(999, "b");
    same_secret.keyset_id = "00ffffffffffffff".into();
    assert_eq!(s.remove(MINT, &[same_secret]).unwrap(), 1);

    assert_eq!(secrets(&s, MINT), ["a", "c"].iter().map(|s| s.to_string()).collect::<BTreeSet<String>>());
    assert_eq!(s.balance(MINT).unwrap(), 5);
}

#[test]
fn no_two_proofs_share_a_secret() {
    let dir = tempfile::tempdir().unwrap();
    let s = store(&dir);
    s.add(MINT, vec![proof(1, "a"), proof(2, "a")]).unwrap();
    s.add(MINT, vec![proof(4, "a"), proof(8, "b")]).unwrap();

    let stored = s.proofs_for(MINT).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(s.balance(MINT).unwrap(), 12);
}

#[test]
fn unknown_fields_survive_a_rewrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("proofs.json");
    let raw = serde_json::json!({
        "proofs": {
            MINT: [{
                "id": "009a1f293253e41e",
                "amount": 2,
                "secret": "[\"P2PK\",{\"nonce\":\"00\",\"data\":\"02aa\"}]",
                "C": "02bc",
                "witness": "{\"signatures\":[\"aa\"]}",
                "dleq": {"e": "01", "s": "02", "r": "03"}
            }]
        }
    });
    std::fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

    let s = store(&dir);
    s.add(MINT, vec![proof(1, "new")]).unwrap();

    let back: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let first = &back["proofs"][MINT][0];
    assert_eq!(first["witness"], "{\"signatures\":[\"aa\"]}");
    assert_eq!(first["dleq"]["r"], "03");
    assert_eq!(back["proofs"][MINT].as_array().unwrap().len(), 2);
}

#[test]
fn descriptive_field_names_are_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("proofs.json");
    std::fs::write(
        &path,
        r#"{"proofs":{"https://m":[{"mintKeysetId":"k","amount":32,"secret":"s","unblindedSignature":"02cc"}]}}"#,
    )
    .unwrap();

    let s = store(&dir);
    let got = s.proofs_for("https://m").unwrap();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].keyset_id, "k");
    assert_eq!(got[0].c, "02cc");
}

#[test]
fn malformed_store_is_kept_aside_on_first_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("proofs.json");
    std::fs::write(&path, "{\"proofs\": [").unwrap();

    let s = store(&dir);
    assert!(s.proofs_for(MINT).unwrap().is_empty());
    // reads alone never create a backup
    let corrupt_count = || {
        std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("proofs.json.corrupt-"))
            .count()
    };
    assert_eq!(corrupt_count(), 0);

    s.add(MINT, vec![proof(2, "a")]).unwrap();
    assert_eq!(corrupt_count(), 1);
    assert_eq!(s.balance(MINT).unwrap(), 2);
}

#[test]
fn lock_marker_is_removed_after_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let s = store(&dir);
    s.add(MINT, vec![proof(1, "a")]).unwrap();
    assert!(!dir.path().join("proofs.json.lock").exists());
}

#[cfg(unix)]
#[test]
fn store_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempfile::tempdir().unwrap();
    let s = store(&dir);
    s.add(MINT, vec![proof(1, "a")]).unwrap();
    let mode = std::fs::metadata(s.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
