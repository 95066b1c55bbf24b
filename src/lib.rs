//! # JournalKV
//!
//! A network-accessible key-value store with:
//! - A replayable write-ahead transaction log for durability
//! - Interchangeable log backends (append-only file, SQLite table)
//! - Single commit worker per log, concurrent producers
//! - Startup recovery that rebuilds the keyspace from the log
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │          (apply to keyspace, record in journal)              │
//! └──────────┬──────────────────────────────┬───────────────────┘
//!            │                              │
//!            ▼                              ▼
//!     ┌─────────────┐               ┌───────────────┐
//!     │  Keyspace   │               │  Transaction  │
//!     │  (RwLock)   │◀── replay ────│      Log      │
//!     └─────────────┘               │ (file/sqlite) │
//!                                   └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod engine;
pub mod journal;
pub mod keyspace;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, JournalBackend};
pub use engine::Engine;
pub use error::{KvError, Result};
pub use journal::{restore, Event, EventKind, FileLog, SqliteLog, TransactionLog};
pub use keyspace::Keyspace;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of JournalKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
