//! Issuance log chaining across many appends.

use std::io::Write;

use wfsl_crypto::Ed25519Signer;
use wfsl_licence_core::{ErrorKind, IssuanceLedger};

use crate::issue_token;

fn ledger_with(n: usize) -> (tempfile::TempDir, IssuanceLedger) {
    let dir = tempfile::tempdir().unwrap();
    let ledger = IssuanceLedger::new(dir.path().join(".wfsl").join("issuance.log.jsonl"));
    let signer = Ed25519Signer::random();

    for i in 0..n {
        let issued = issue_token(&signer, &format!("org_{i}"), "pro", &[], 3600);
        ledger.append(&issued.payload, &issued.token).unwrap();
    }
    (dir, ledger)
}

#[test]
fn test_appends_form_a_chain() {
    let (_dir, ledger) = ledger_with(5);

    let entries = ledger.read_entries().unwrap();
    assert_eq!(entries.len(), 5);
    assert!(entries[0].prev.is_none());
    for pair in entries.windows(2) {
        assert_eq!(pair[1].prev.as_deref(), Some(pair[0].entry_hash.as_str()));
    }

    let report = ledger.ensure_intact().unwrap();
    assert_eq!(report.total_entries, 5);
    assert_eq!(report.head_hash.as_deref(), Some(entries[4].entry_hash.as_str()));
}

#[test]
fn test_entries_do_not_contain_token_text() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = IssuanceLedger::new(dir.path().join("log.jsonl"));
    let signer = Ed25519Signer::random();
    let issued = issue_token(&signer, "org_1", "pro", &["a", "b"], 3600);

    let entry = ledger.append(&issued.payload, &issued.token).unwrap();
    assert_eq!(entry.features_count, 2);
    assert!(entry.token_hash.starts_with("sha256:"));

    let raw = std::fs::read_to_string(ledger.path()).unwrap();
    assert!(!raw.contains(&issued.token));
    assert!(raw.ends_with('\n'));
}

#[test]
fn test_corrupt_tail_blocks_append() {
    let (_dir, ledger) = ledger_with(2);
    let before = std::fs::read_to_string(ledger.path()).unwrap();

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(ledger.path())
        .unwrap();
    file.write_all(b"{not json\n").unwrap();
    drop(file);

    let signer = Ed25519Signer::random();
    let issued = issue_token(&signer, "org_x", "pro", &[], 3600);
    let err = ledger.append(&issued.payload, &issued.token).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TamperDetected);

    let after = std::fs::read_to_string(ledger.path()).unwrap();
    assert_eq!(after, format!("{before}{{not json\n"));
}

#[test]
fn test_removed_entry_breaks_chain() {
    let (_dir, ledger) = ledger_with(3);
    let raw = std::fs::read_to_string(ledger.path()).unwrap();
    let kept: Vec<&str> = raw.lines().enumerate().filter(|(i, _)| *i != 1).map(|(_, l)| l).collect();
    std::fs::write(ledger.path(), format!("{}\n", kept.join("\n"))).unwrap();

    let report = ledger.verify_chain().unwrap();
    assert!(!report.valid);
    assert_eq!(report.first_broken_index, Some(1));
    assert_eq!(ledger.ensure_intact().unwrap_err().kind(), ErrorKind::TamperDetected);
}
