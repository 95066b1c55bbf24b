//! Engine Module
//!
//! The serving-layer coordinator: owns the keyspace and the transaction log
//! and keeps them consistent.
//!
//! ## Responsibilities
//! - Construct the configured log backend and replay it at startup
//! - Apply mutations to the keyspace and record them in the log
//! - Drain the log's asynchronous error stream into structured logging
//!
//! ## Concurrency Model
//! Many connection threads call into the engine concurrently. Reads hit the
//! keyspace's reader lock; writes take its writer lock and then enqueue onto
//! the log's bounded FIFO queue, where a single commit worker serializes all
//! durable writes. No lock is held across the enqueue.

use std::fs;
use std::path::Path;
use std::thread;

use crate::config::{Config, JournalBackend};
use crate::error::{KvError, Result};
use crate::journal::{restore, FileLog, RestoreReport, SqliteLog, TransactionLog};
use crate::keyspace::Keyspace;
use crate::protocol::Command;

/// The main store engine
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// In-memory key-value state
    keyspace: Keyspace,

    /// Durable transaction log (file or sqlite, chosen at construction)
    journal: Box<dyn TransactionLog>,

    /// Replay outcome from startup
    restore_report: RestoreReport,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const FILE_LOG_FILENAME: &'static str = "transactions.log";
    const SQLITE_LOG_FILENAME: &'static str = "transactions.db";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Construct the configured log backend
    /// 3. Replay the log into the keyspace, then switch the log live
    /// 4. Start draining the log's error stream
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let journal: Box<dyn TransactionLog> = match config.backend {
            JournalBackend::File => Box::new(FileLog::open(
                config.data_dir.join(Self::FILE_LOG_FILENAME),
            )?),
            JournalBackend::Sqlite => Box::new(SqliteLog::open(
                config.data_dir.join(Self::SQLITE_LOG_FILENAME),
            )?),
        };

        let keyspace = Keyspace::new();
        let restore_report = restore(journal.as_ref(), &keyspace)?;

        tracing::info!(
            backend = ?config.backend,
            events_replayed = restore_report.events_replayed,
            keys = keyspace.len(),
            "engine recovered"
        );

        // The 1-slot error channel must be drained promptly or later commit
        // failures are dropped; this monitor is that consumer. It exits when
        // the log (and with it the error sender) is dropped.
        let errors = journal.errors();
        thread::spawn(move || {
            for err in errors {
                tracing::error!(error = %err, "transaction log commit failure");
            }
        });

        Ok(Self {
            config,
            keyspace,
            journal,
            restore_report,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Option<String>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Ping => Ok(Some("PONG".to_string())),
        }
    }

    /// Get a value by key
    ///
    /// A miss surfaces as [`KvError::KeyNotFound`] so the serving layer can
    /// map it to a NOT_FOUND response, not a server fault.
    pub fn get(&self, key: &str) -> Result<String> {
        self.keyspace.get(key).ok_or(KvError::KeyNotFound)
    }

    /// Put a key-value pair: apply to the keyspace, then record in the log
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        self.keyspace.put(key, value);
        self.journal.write_put(key, value)
    }

    /// Delete a key: apply to the keyspace, then record in the log
    pub fn delete(&self, key: &str) -> Result<()> {
        self.keyspace.delete(key);
        self.journal.write_delete(key)
    }

    /// Block until every enqueued log event is durably committed or failed
    pub fn wait(&self) {
        self.journal.wait();
    }

    /// Close the engine gracefully: drain and close the transaction log
    pub fn close(self) -> Result<()> {
        self.journal.close()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The in-memory keyspace
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Replay outcome from startup
    pub fn restore_report(&self) -> RestoreReport {
        self.restore_report
    }

    /// Last sequence number tracked by the log backend
    pub fn last_sequence(&self) -> u64 {
        self.journal.last_sequence()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
