use std::collections::BTreeMap;
use std::fs;

use sasldb_core_store::{CredentialWriter, LegacyRecord, WriteError};
use sasldb_hash_store::{HashFileOpener, HashTable};
use sasldb_migrate::{migrate, MigrateError};

#[derive(Default)]
struct Collect(BTreeMap<Vec<u8>, Vec<u8>>);

impl CredentialWriter for Collect {
    fn write_record(&mut self, record: &LegacyRecord) -> Result<(), WriteError> {
        self.0.insert(record.authid().to_vec(), record.secret().to_vec());
        Ok(())
    }
}

fn legacy_table() -> HashTable {
    let mut entries: Vec<(Vec<u8>, Vec<u8>)> = (0..50)
        .map(|i| {
            (
                format!("user{}\0example.com\0userPassword", i).into_bytes(),
                format!("secret{}", i).into_bytes(),
            )
        })
        .collect();
    entries.push((b"\0example.com\0cmusaslsecretPLAIN".to_vec(), b"".to_vec()));
    entries.push((b"broken-key-without-separators".to_vec(), b"?".to_vec()));
    entries.into_iter().collect()
}

#[test]
fn migrates_every_credential_from_a_hash_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sasldb2");
    legacy_table().persist(&path).unwrap();

    let mut dest = Collect::default();
    let report = migrate(&HashFileOpener::read_only(), &path, &mut dest).unwrap();

    assert_eq!(report.seen, 52);
    assert_eq!(report.migrated, 50);
    assert_eq!(report.skipped_marker, 1);
    assert_eq!(report.skipped_corrupt, 1);
    assert!(report.is_consistent());
    assert_eq!(dest.0.get(&b"user7"[..]), Some(&b"secret7".to_vec()));
}

#[test]
fn truncated_file_aborts_with_partial_report() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sasldb2");
    legacy_table().persist(&path).unwrap();

    let len = fs::metadata(&path).unwrap().len();
    let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(len - 3).unwrap();
    drop(file);

    let mut dest = Collect::default();
    let err = migrate(&HashFileOpener::read_only(), &path, &mut dest).unwrap_err();

    let report = match err {
        MigrateError::Iteration { report, .. } => report,
        other => panic!("unexpected error {:?}", other),
    };
    assert_eq!(report.seen, 51);
    assert!(report.is_consistent());
    assert_eq!(dest.0.len(), report.migrated);
}

#[test]
fn missing_source_under_read_only_opener_fails_to_open() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent");

    let err = migrate(&HashFileOpener::read_only(), &path, &mut Collect::default()).unwrap_err();
    assert!(matches!(err, MigrateError::Open(_)));
    assert!(err.partial_report().is_none());
}

#[test]
fn missing_source_under_default_opener_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent");

    let report = migrate(&HashFileOpener::new(), &path, &mut Collect::default()).unwrap();
    assert_eq!(report.seen, 0);
}
