//! Tests for the SQLite-backed transaction log
//!
//! These tests verify:
//! - The same logging contract as the file backend, over a table
//! - Database-assigned sequence numbers (1, 2, 3, ...)
//! - Replay across instances over the same database file
//! - The last_sequence() stub (always 0 on this backend)
//! - Lifecycle rules shared with the file backend

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use journalkv::journal::TransactionLog;
use journalkv::{Event, EventKind, KvError, SqliteLog};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_db() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("transactions.db");
    (temp_dir, db_path)
}

fn drain(log: &impl TransactionLog) -> (Vec<Event>, Option<KvError>) {
    let (events, errors) = log.read_events();
    let collected: Vec<Event> = events.iter().collect();
    let error = errors.recv().ok();
    (collected, error)
}

// =============================================================================
// Commit Pipeline Tests
// =============================================================================

#[test]
fn test_put_put_delete_commits_in_order() {
    let log = SqliteLog::in_memory().unwrap();
    log.run().unwrap();

    log.write_put("k1", "v1").unwrap();
    log.write_put("k2", "v2").unwrap();
    log.write_delete("k1").unwrap();
    log.wait();

    let (events, error) = drain(&log);
    assert!(error.is_none());

    let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
    let kinds: Vec<EventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(sequences, vec![1, 2, 3]);
    assert_eq!(kinds, vec![EventKind::Put, EventKind::Put, EventKind::Delete]);

    log.close().unwrap();
}

#[test]
fn test_escaped_fields_round_trip_through_table() {
    let log = SqliteLog::in_memory().unwrap();
    log.run().unwrap();

    log.write_put("tab\tkey", "multi\nline %20 value").unwrap();
    log.wait();

    let (events, error) = drain(&log);
    assert!(error.is_none());
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key, "tab\tkey");
    assert_eq!(events[0].value, "multi\nline %20 value");
}

#[test]
fn test_concurrent_producers_all_commit() {
    let log = Arc::new(SqliteLog::in_memory().unwrap());
    log.run().unwrap();

    const PRODUCERS: usize = 4;
    const WRITES_PER_PRODUCER: usize = 10;

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for i in 0..WRITES_PER_PRODUCER {
                    log.write_put(&format!("p{}-k{}", p, i), "v").unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    log.wait();

    let (events, error) = drain(log.as_ref());
    assert!(error.is_none());
    assert_eq!(events.len(), PRODUCERS * WRITES_PER_PRODUCER);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.sequence, (i + 1) as u64);
    }

    log.close().unwrap();
}

// =============================================================================
// Reopen Tests
// =============================================================================

#[test]
fn test_second_instance_replays_identically() {
    let (_temp, db_path) = setup_temp_db();

    let first = SqliteLog::open(&db_path).unwrap();
    first.run().unwrap();
    first.write_put("k1", "v1").unwrap();
    first.write_put("k2", "v2").unwrap();
    first.write_delete("k1").unwrap();
    first.close().unwrap();
    drop(first);

    let second = SqliteLog::open(&db_path).unwrap();
    let (events, error) = drain(&second);
    assert!(error.is_none());
    assert_eq!(events.len(), 3);
    assert_eq!(events[2].kind, EventKind::Delete);

    // The database continues numbering where it left off.
    second.run().unwrap();
    second.write_put("k3", "v3").unwrap();
    second.wait();

    let (events, error) = drain(&second);
    assert!(error.is_none());
    assert_eq!(events.len(), 4);
    assert_eq!(events[3].sequence, 4);

    second.close().unwrap();
}

// =============================================================================
// Contract Gap Tests
// =============================================================================

#[test]
fn test_last_sequence_is_a_stub() {
    let log = SqliteLog::in_memory().unwrap();
    log.run().unwrap();
    log.write_put("k", "v").unwrap();
    log.wait();

    // Sequencing is delegated to the database; the instance reports 0.
    assert_eq!(log.last_sequence(), 0);

    log.close().unwrap();
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_write_before_run_fails_fast() {
    let log = SqliteLog::in_memory().unwrap();
    assert!(matches!(
        log.write_put("k", "v"),
        Err(KvError::LogNotRunning)
    ));
}

#[test]
fn test_write_after_close_fails_fast() {
    let log = SqliteLog::in_memory().unwrap();
    log.run().unwrap();
    log.close().unwrap();
    assert!(matches!(log.write_put("k", "v"), Err(KvError::LogClosed)));
}

#[test]
fn test_double_close_is_safe() {
    let log = SqliteLog::in_memory().unwrap();
    log.run().unwrap();
    log.write_put("k", "v").unwrap();
    log.close().unwrap();
    log.close().unwrap();
}
