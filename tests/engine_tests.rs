//! Tests for the store engine
//!
//! These tests verify:
//! - Put/get/delete through the serving API
//! - Not-found semantics for missing and deleted keys
//! - Crash recovery: a reopened engine rebuilds state from the log
//! - Command execution routing
//! - Both log backends behind the same engine

use journalkv::protocol::Command;
use journalkv::{Config, Engine, JournalBackend, KvError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn sqlite_config(temp: &TempDir) -> Config {
    Config::builder()
        .data_dir(temp.path())
        .backend(JournalBackend::Sqlite)
        .build()
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_put_get_delete() {
    let temp = TempDir::new().unwrap();
    let engine = Engine::open_path(temp.path()).unwrap();

    engine.put("k1", "v1").unwrap();
    assert_eq!(engine.get("k1").unwrap(), "v1");

    engine.delete("k1").unwrap();
    assert!(matches!(engine.get("k1"), Err(KvError::KeyNotFound)));

    engine.close().unwrap();
}

#[test]
fn test_get_never_written_key() {
    let temp = TempDir::new().unwrap();
    let engine = Engine::open_path(temp.path()).unwrap();

    assert!(matches!(engine.get("missing"), Err(KvError::KeyNotFound)));

    engine.close().unwrap();
}

#[test]
fn test_latest_put_wins() {
    let temp = TempDir::new().unwrap();
    let engine = Engine::open_path(temp.path()).unwrap();

    engine.put("k", "first").unwrap();
    engine.put("k", "second").unwrap();
    assert_eq!(engine.get("k").unwrap(), "second");

    engine.close().unwrap();
}

// =============================================================================
// Command Routing
// =============================================================================

#[test]
fn test_execute_routes_commands() {
    let temp = TempDir::new().unwrap();
    let engine = Engine::open_path(temp.path()).unwrap();

    assert_eq!(
        engine.execute(Command::Ping).unwrap(),
        Some("PONG".to_string())
    );

    engine
        .execute(Command::Put {
            key: "k".to_string(),
            value: "v".to_string(),
        })
        .unwrap();

    assert_eq!(
        engine
            .execute(Command::Get {
                key: "k".to_string()
            })
            .unwrap(),
        Some("v".to_string())
    );

    engine
        .execute(Command::Delete {
            key: "k".to_string(),
        })
        .unwrap();

    assert!(matches!(
        engine.execute(Command::Get {
            key: "k".to_string()
        }),
        Err(KvError::KeyNotFound)
    ));

    engine.close().unwrap();
}

// =============================================================================
// Recovery
// =============================================================================

#[test]
fn test_reopened_engine_recovers_state() {
    let temp = TempDir::new().unwrap();

    {
        let engine = Engine::open_path(temp.path()).unwrap();
        engine.put("k1", "v1").unwrap();
        engine.put("k2", "v2").unwrap();
        engine.delete("k1").unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open_path(temp.path()).unwrap();
    assert_eq!(engine.restore_report().events_replayed, 3);
    assert_eq!(engine.last_sequence(), 3);

    assert!(matches!(engine.get("k1"), Err(KvError::KeyNotFound)));
    assert_eq!(engine.get("k2").unwrap(), "v2");

    // New writes continue the sequence numbering.
    engine.put("k3", "v3").unwrap();
    engine.wait();
    assert_eq!(engine.last_sequence(), 4);

    engine.close().unwrap();
}

#[test]
fn test_sqlite_engine_recovers_state() {
    let temp = TempDir::new().unwrap();

    {
        let engine = Engine::open(sqlite_config(&temp)).unwrap();
        engine.put("k1", "v1").unwrap();
        engine.put("k2", "v2").unwrap();
        engine.delete("k1").unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(sqlite_config(&temp)).unwrap();
    assert_eq!(engine.restore_report().events_replayed, 3);
    assert_eq!(engine.restore_report().last_sequence, 3);

    assert!(matches!(engine.get("k1"), Err(KvError::KeyNotFound)));
    assert_eq!(engine.get("k2").unwrap(), "v2");

    engine.close().unwrap();
}

#[test]
fn test_open_fails_on_corrupt_log() {
    let temp = TempDir::new().unwrap();
    std::fs::write(
        temp.path().join("transactions.log"),
        "2\t2\tk\tv\n1\t2\tk2\tv2\n",
    )
    .unwrap();

    assert!(matches!(
        Engine::open_path(temp.path()),
        Err(KvError::OutOfSequence { .. })
    ));
}
