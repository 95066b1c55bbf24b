//! Transaction Log (Journal) Module
//!
//! Provides durability through a replayable write-ahead transaction log.
//!
//! ## Responsibilities
//! - Record every mutation as a sequenced event before/alongside applying it
//! - Single background commit worker per log (serializes medium writes)
//! - Replay past events at startup to rebuild the keyspace
//! - Two interchangeable durable backends: append-only file and SQLite table
//!
//! ## File Record Format
//! ```text
//! ┌──────────┬──────┬──────────┬──────────────┐
//! │ sequence │ kind │   key    │    value     │  one line per event,
//! └──────────┴──────┴──────────┴──────────────┘  tab-delimited
//! kind: 1 = Delete, 2 = Put
//! key/value: percent-escaped (delimiter-safe)
//! ```
//!
//! ## Write Path
//! Producer threads enqueue events onto a bounded FIFO channel; exactly one
//! commit worker drains the channel and writes each event durably before
//! decrementing the in-flight counter. Commit failures are reported on a
//! 1-slot asynchronous error channel and never halt the worker.

mod event;
mod file;
mod pending;
mod recovery;
mod sqlite;

pub use event::{Event, EventKind, SequenceValidator, escape_field, unescape_field};
pub use file::FileLog;
pub use pending::PendingWrites;
pub use recovery::{restore, RestoreReport};
pub use sqlite::SqliteLog;

use crossbeam::channel::{Receiver, Sender};

use crate::error::{KvError, Result};

/// Capacity of the pending-event queue (bounded, provides back-pressure)
pub const EVENT_QUEUE_CAPACITY: usize = 16;

/// Capacity of the asynchronous error channel.
///
/// One slot only: at most one unconsumed commit failure is buffered, and
/// later failures are dropped until a consumer drains the slot. Callers that
/// care about commit outcomes must drain [`TransactionLog::errors`] promptly
/// or call [`TransactionLog::wait`].
pub const ERROR_CHANNEL_CAPACITY: usize = 1;

/// The logging contract every durable backend satisfies.
///
/// Backends are interchangeable: the serving layer and the recovery
/// orchestrator depend only on this trait, never on the concrete medium.
///
/// ## Lifecycle
/// constructed (medium opened, writes rejected) → replay-only
/// ([`read_events`](Self::read_events) before [`run`](Self::run)) → running
/// (single commit worker live) → closed (pending writes drained, medium
/// released). Writes outside the running state fail fast.
pub trait TransactionLog: Send + Sync {
    /// Enqueue a Put event.
    ///
    /// Increments the in-flight counter and hands the event to the commit
    /// worker. Blocks only on queue back-pressure; durable-write failures
    /// surface asynchronously on [`errors`](Self::errors).
    fn write_put(&self, key: &str, value: &str) -> Result<()>;

    /// Enqueue a Delete event. Same semantics as [`write_put`](Self::write_put).
    fn write_delete(&self, key: &str) -> Result<()>;

    /// The asynchronous commit-failure stream (1-slot buffer).
    fn errors(&self) -> Receiver<KvError>;

    /// Start the single commit worker and make the write path live.
    ///
    /// Idempotent per instance; calling it again while running is a no-op.
    fn run(&self) -> Result<()>;

    /// Block until every enqueued event has been committed or has
    /// failed-and-been-reported. A flush barrier for any number of producers.
    fn wait(&self);

    /// Wait for pending writes, stop accepting new ones, release the medium.
    ///
    /// Idempotent: a second close is a no-op; a write after close fails fast.
    fn close(&self) -> Result<()>;

    /// Stream past events from the start of the durable medium.
    ///
    /// Returns immediately; a background scan populates the event stream in
    /// increasing sequence order, validating strict monotonicity and
    /// unescaping stored fields. Decode or ordering violations surface on the
    /// error stream. Both streams close when the scan completes or aborts.
    fn read_events(&self) -> (Receiver<Event>, Receiver<KvError>);

    /// Highest sequence number observed or assigned by this instance.
    ///
    /// The SQLite backend always reports 0 (sequencing is delegated to the
    /// database's primary-key assignment).
    fn last_sequence(&self) -> u64;
}

/// Write-path state shared by both backends.
///
/// The sender is created by `run()` and dropped by `close()`; dropping it
/// disconnects the channel, which is what tells the commit worker to exit.
pub(crate) enum WriteState {
    /// Constructed but not yet running: writes are rejected
    Idle,
    /// Commit worker live: writes enqueue onto this sender
    Running(Sender<Event>),
    /// Close has begun: writes are rejected permanently
    Closed,
}

impl WriteState {
    /// Enqueue one event, charging `pending` first so `wait()` observes it.
    pub(crate) fn send(&self, event: Event, pending: &PendingWrites) -> Result<()> {
        match self {
            WriteState::Running(tx) => {
                pending.add();
                if tx.send(event).is_err() {
                    // Worker is gone; un-charge so wait() cannot hang.
                    pending.done();
                    return Err(KvError::LogClosed);
                }
                Ok(())
            }
            WriteState::Idle => Err(KvError::LogNotRunning),
            WriteState::Closed => Err(KvError::LogClosed),
        }
    }
}
