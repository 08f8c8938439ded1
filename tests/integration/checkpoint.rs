//! Metadata store: round trip, first run, corrupt files

use chrono::NaiveDate;
use finance_complaint_ingest::resume::{CheckpointRecord, MetadataStore, ResumeError};
use std::path::PathBuf;
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_write_then_read_round_trips() {
    let dir = TempDir::new().unwrap();
    let store = MetadataStore::new(dir.path().join("data_ingestion/meta_info.yaml"));
    let record = CheckpointRecord::new(date(2011, 1, 1), date(2012, 6, 1), "/data/x");

    store.write(&record).unwrap();
    let loaded = store.read().unwrap().unwrap();

    assert_eq!(loaded, record);
    assert_eq!(loaded.dataset_path, PathBuf::from("/data/x"));
}

#[test]
fn test_file_layout_is_plain_yaml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("meta_info.yaml");
    MetadataStore::new(&path)
        .write(&CheckpointRecord::new(date(2011, 12, 1), date(2012, 6, 1), "/data/x"))
        .unwrap();

    let yaml: serde_yaml::Value = serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(yaml["from_date"].as_str(), Some("2011-12-01"));
    assert_eq!(yaml["to_date"].as_str(), Some("2012-06-01"));
    assert_eq!(yaml["data_file_path"].as_str(), Some("/data/x"));
}

#[test]
fn test_hand_written_checkpoint_is_accepted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("meta_info.yaml");
    std::fs::write(
        &path,
        "from_date: 2011-12-01\nto_date: 2012-03-01\ndata_file_path: finance_artifact/data_ingestion/feature_store/finance_complaint.jsonl\n",
    )
    .unwrap();

    let record = MetadataStore::new(&path).read().unwrap().unwrap();
    assert_eq!(record.to_date, date(2012, 3, 1));
}

#[test]
fn test_missing_checkpoint_means_first_run() {
    let dir = TempDir::new().unwrap();
    let store = MetadataStore::new(dir.path().join("nowhere/meta_info.yaml"));
    assert!(store.read().unwrap().is_none());
    // Reading must not create the directory tree
    assert!(!dir.path().join("nowhere").exists());
}

#[test]
fn test_corrupt_checkpoint_is_reported() {
    let dir = TempDir::new().unwrap();
    for contents in [
        "this is not yaml: [",
        "from_date: 2011-12-01\n",
        "from_date: yesterday\nto_date: 2012-01-01\ndata_file_path: /x\n",
    ] {
        let path = dir.path().join("meta_info.yaml");
        std::fs::write(&path, contents).unwrap();

        let err = MetadataStore::new(&path).read().unwrap_err();
        assert!(
            matches!(err, ResumeError::CheckpointCorrupt { .. }),
            "{contents:?} gave {err:?}"
        );
    }
}
