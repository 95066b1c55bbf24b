//! SQLite-backed transaction log
//!
//! Same contract as the file backend, different medium: events are rows in
//! an append-only `transactions` table and the sequence number is assigned
//! by the database's auto-incrementing primary key rather than by the commit
//! worker. Replay streams rows through the same validate/unescape pipeline
//! as the file backend.

use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver};
use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::error::{KvError, Result};

use super::event::{escape_field, unescape_field, Event, EventKind, SequenceValidator};
use super::pending::PendingWrites;
use super::{TransactionLog, WriteState, ERROR_CHANNEL_CAPACITY, EVENT_QUEUE_CAPACITY};

/// Table schema: auto-assigned sequence, numeric kind, escaped fields
const CREATE_TABLE_SQL: &str = "
CREATE TABLE IF NOT EXISTS transactions (
    sequence   INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type INTEGER NOT NULL,
    key        TEXT NOT NULL,
    value      TEXT NOT NULL DEFAULT ''
)";

const INSERT_SQL: &str = "INSERT INTO transactions (event_type, key, value) VALUES (?1, ?2, ?3)";

const SELECT_SQL: &str =
    "SELECT sequence, event_type, key, value FROM transactions ORDER BY sequence";

/// Transaction log over a SQLite table
pub struct SqliteLog {
    /// Shared connection: the commit worker inserts, replay scans select
    conn: Arc<Mutex<Connection>>,

    /// Write-path state: Idle → Running(sender) → Closed
    state: Mutex<WriteState>,

    /// Commit worker handle, joined on close
    worker: Mutex<Option<JoinHandle<()>>>,

    /// Events enqueued but not yet committed or failed
    pending: Arc<PendingWrites>,

    /// Commit-failure reporting (1-slot)
    err_tx: crossbeam::channel::Sender<KvError>,
    err_rx: Receiver<KvError>,
}

impl SqliteLog {
    /// Open or create the database file and ensure the table exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        tracing::debug!(path = %path.display(), "opened sqlite transaction log");
        Self::with_connection(conn)
    }

    /// In-memory database, for tests.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE_SQL)?;

        let (err_tx, err_rx) = bounded(ERROR_CHANNEL_CAPACITY);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            state: Mutex::new(WriteState::Idle),
            worker: Mutex::new(None),
            pending: Arc::new(PendingWrites::new()),
            err_tx,
            err_rx,
        })
    }

    /// Commit loop: one INSERT per event, FIFO, until the channel disconnects.
    fn commit_loop(
        conn: Arc<Mutex<Connection>>,
        events: Receiver<Event>,
        err_tx: crossbeam::channel::Sender<KvError>,
        pending: Arc<PendingWrites>,
    ) {
        for event in events {
            let result = conn.lock().execute(
                INSERT_SQL,
                params![
                    event.kind.code(),
                    escape_field(&event.key),
                    escape_field(&event.value)
                ],
            );

            if let Err(e) = result {
                tracing::warn!(kind = ?event.kind, error = %e, "transaction insert failed");
                // 1-slot channel: drop the report if one is already pending.
                let _ = err_tx.try_send(KvError::Sqlite(e));
            } else {
                tracing::trace!(kind = ?event.kind, key = %event.key, "committed event row");
            }

            // Decrement regardless of outcome so wait() cannot deadlock.
            pending.done();
        }
    }

    /// Scan body, separated out so channel-disconnect handling stays in one
    /// place in `read_events`.
    fn scan(
        conn: &Connection,
        event_tx: &crossbeam::channel::Sender<Event>,
    ) -> Result<()> {
        let mut stmt = conn.prepare(SELECT_SQL)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut validator = SequenceValidator::default();
        for row in rows {
            let (sequence, kind_code, key, value) = row?;

            let event = Event {
                sequence: sequence as u64,
                kind: EventKind::from_code(kind_code as u64)?,
                key: unescape_field(&key)?,
                value: unescape_field(&value)?,
            };

            validator.check(event.sequence)?;

            if event_tx.send(event).is_err() {
                // Consumer hung up; abort the scan.
                return Ok(());
            }
        }

        Ok(())
    }
}

impl TransactionLog for SqliteLog {
    fn write_put(&self, key: &str, value: &str) -> Result<()> {
        self.state.lock().send(Event::put(key, value), &self.pending)
    }

    fn write_delete(&self, key: &str) -> Result<()> {
        self.state.lock().send(Event::delete(key), &self.pending)
    }

    fn errors(&self) -> Receiver<KvError> {
        self.err_rx.clone()
    }

    fn run(&self) -> Result<()> {
        let mut state = self.state.lock();
        match *state {
            WriteState::Running(_) => Ok(()),
            WriteState::Closed => Err(KvError::LogClosed),
            WriteState::Idle => {
                let (tx, rx) = bounded(EVENT_QUEUE_CAPACITY);

                let conn = Arc::clone(&self.conn);
                let err_tx = self.err_tx.clone();
                let pending = Arc::clone(&self.pending);
                let handle = thread::spawn(move || {
                    Self::commit_loop(conn, rx, err_tx, pending);
                });

                *state = WriteState::Running(tx);
                *self.worker.lock() = Some(handle);
                tracing::debug!("sqlite log commit worker started");
                Ok(())
            }
        }
    }

    fn wait(&self) {
        self.pending.wait();
    }

    fn close(&self) -> Result<()> {
        self.pending.wait();

        {
            let mut state = self.state.lock();
            if matches!(*state, WriteState::Closed) {
                return Ok(());
            }
            // Dropping the sender disconnects the channel and stops the worker.
            *state = WriteState::Closed;
        }

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::warn!("commit worker panicked during close");
            }
        }

        // The connection itself is released when the last Arc clone drops.
        tracing::debug!("sqlite log closed");
        Ok(())
    }

    fn read_events(&self) -> (Receiver<Event>, Receiver<KvError>) {
        let (event_tx, event_rx) = bounded(0);
        let (error_tx, error_rx) = bounded(ERROR_CHANNEL_CAPACITY);

        let conn = Arc::clone(&self.conn);
        thread::spawn(move || {
            // The ordered scan holds the connection for its duration; the
            // commit worker is not running during replay (see recovery).
            if let Err(e) = Self::scan(&conn.lock(), &event_tx) {
                let _ = error_tx.send(e);
            }
            // Dropping both senders closes the streams.
        });

        (event_rx, error_rx)
    }

    /// Always 0: sequencing is delegated to the database's primary-key
    /// assignment, and this backend does not track it internally.
    fn last_sequence(&self) -> u64 {
        0
    }
}
