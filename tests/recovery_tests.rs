//! Tests for startup recovery
//!
//! These tests verify:
//! - Replaying a log rebuilds the keyspace exactly
//! - Recovery switches the log into live commit mode afterwards
//! - Decode/ordering errors during replay are fatal
//! - Both backends recover to the same state from the same history

use journalkv::journal::TransactionLog;
use journalkv::{restore, FileLog, Keyspace, KvError, SqliteLog};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// Record the canonical 3-event history: put k1, put k2, delete k1.
fn record_history(log: &impl TransactionLog) {
    log.run().unwrap();
    log.write_put("k1", "v1").unwrap();
    log.write_put("k2", "v2").unwrap();
    log.write_delete("k1").unwrap();
    log.close().unwrap();
}

// =============================================================================
// Fresh Log Tests
// =============================================================================

#[test]
fn test_restore_from_empty_log() {
    let temp = TempDir::new().unwrap();
    let log = FileLog::open(temp.path().join("transactions.log")).unwrap();
    let keyspace = Keyspace::new();

    let report = restore(&log, &keyspace).unwrap();
    assert_eq!(report.events_replayed, 0);
    assert_eq!(report.last_sequence, 0);
    assert!(keyspace.is_empty());

    // restore() must have made the write path live.
    log.write_put("k", "v").unwrap();
    log.close().unwrap();
}

// =============================================================================
// Replay Tests
// =============================================================================

#[test]
fn test_restore_rebuilds_keyspace_from_file_log() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("transactions.log");

    record_history(&FileLog::open(&log_path).unwrap());

    let log = FileLog::open(&log_path).unwrap();
    let keyspace = Keyspace::new();
    let report = restore(&log, &keyspace).unwrap();

    assert_eq!(report.events_replayed, 3);
    assert_eq!(report.last_sequence, 3);

    // Delete wins over the earlier put of k1.
    assert_eq!(keyspace.get("k1"), None);
    assert_eq!(keyspace.get("k2"), Some("v2".to_string()));
    assert_eq!(keyspace.len(), 1);

    log.close().unwrap();
}

#[test]
fn test_restore_rebuilds_keyspace_from_sqlite_log() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("transactions.db");

    record_history(&SqliteLog::open(&db_path).unwrap());

    let log = SqliteLog::open(&db_path).unwrap();
    let keyspace = Keyspace::new();
    let report = restore(&log, &keyspace).unwrap();

    assert_eq!(report.events_replayed, 3);
    assert_eq!(report.last_sequence, 3);
    assert_eq!(keyspace.get("k1"), None);
    assert_eq!(keyspace.get("k2"), Some("v2".to_string()));

    log.close().unwrap();
}

#[test]
fn test_restored_log_continues_sequence_numbering() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("transactions.log");

    record_history(&FileLog::open(&log_path).unwrap());

    let log = FileLog::open(&log_path).unwrap();
    let keyspace = Keyspace::new();
    restore(&log, &keyspace).unwrap();

    log.write_put("k3", "v3").unwrap();
    log.wait();
    assert_eq!(log.last_sequence(), 4);

    log.close().unwrap();
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_restore_fails_on_out_of_sequence_log() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("transactions.log");
    std::fs::write(&log_path, "1\t2\tk1\tv1\n1\t2\tk2\tv2\n").unwrap();

    let log = FileLog::open(&log_path).unwrap();
    let keyspace = Keyspace::new();
    let err = restore(&log, &keyspace).unwrap_err();

    assert!(matches!(err, KvError::OutOfSequence { .. }));
}

#[test]
fn test_restore_fails_on_malformed_log() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("transactions.log");
    std::fs::write(&log_path, "1\t2\tk1\tv1\nnot-a-record\n").unwrap();

    let log = FileLog::open(&log_path).unwrap();
    let keyspace = Keyspace::new();
    let err = restore(&log, &keyspace).unwrap_err();

    assert!(matches!(err, KvError::MalformedRecord(_)));
}
