//! Error types for JournalKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for JournalKV operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // -------------------------------------------------------------------------
    // Journal Errors
    // -------------------------------------------------------------------------
    #[error("malformed log record: {0}")]
    MalformedRecord(String),

    #[error("transaction numbers out of sequence (last {last}, found {found})")]
    OutOfSequence { last: u64, found: u64 },

    #[error("value decoding failure: {0}")]
    FieldDecode(String),

    /// A write was attempted before `run()` switched the log live.
    #[error("transaction log is not running")]
    LogNotRunning,

    /// A write was attempted after `close()` began.
    #[error("transaction log is closed")]
    LogClosed,

    // -------------------------------------------------------------------------
    // Keyspace Errors
    // -------------------------------------------------------------------------
    #[error("no such key")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("network error: {0}")]
    Network(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),
}
