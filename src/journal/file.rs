//! File-backed transaction log
//!
//! The durable medium is an append-only tab-delimited text file. Sequence
//! numbers are generator-owned: the commit worker assigns them at commit
//! time, so numbering reflects true FIFO commit order even with many
//! concurrent producers. The writer never rewrites or truncates.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver};
use parking_lot::Mutex;

use crate::error::{KvError, Result};

use super::event::{Event, SequenceValidator};
use super::pending::PendingWrites;
use super::{TransactionLog, WriteState, ERROR_CHANNEL_CAPACITY, EVENT_QUEUE_CAPACITY};

/// Transaction log over a local append-only file
pub struct FileLog {
    /// Path to the log file (replay scans open their own read handle)
    path: PathBuf,

    /// Append handle opened at construction; moved into the worker by `run()`
    file: Mutex<Option<File>>,

    /// Write-path state: Idle → Running(sender) → Closed
    state: Mutex<WriteState>,

    /// Commit worker handle, joined on close
    worker: Mutex<Option<JoinHandle<()>>>,

    /// Events enqueued but not yet committed or failed
    pending: Arc<PendingWrites>,

    /// Commit-failure reporting (1-slot)
    err_tx: crossbeam::channel::Sender<KvError>,
    err_rx: Receiver<KvError>,

    /// Last assigned sequence number; seeded by the replay scan,
    /// incremented by the commit worker
    last_sequence: Arc<AtomicU64>,
}

impl FileLog {
    /// Open or create the log file.
    ///
    /// The instance starts in the replay-only state: call
    /// [`read_events`](TransactionLog::read_events) first, then
    /// [`run`](TransactionLog::run) to go live.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&path)?;

        tracing::debug!(path = %path.display(), "opened file transaction log");

        let (err_tx, err_rx) = bounded(ERROR_CHANNEL_CAPACITY);

        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
            state: Mutex::new(WriteState::Idle),
            worker: Mutex::new(None),
            pending: Arc::new(PendingWrites::new()),
            err_tx,
            err_rx,
            last_sequence: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Path of the underlying log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commit loop: runs on the dedicated worker thread until the event
    /// channel disconnects.
    fn commit_loop(
        mut file: File,
        events: Receiver<Event>,
        err_tx: crossbeam::channel::Sender<KvError>,
        pending: Arc<PendingWrites>,
        last_sequence: Arc<AtomicU64>,
    ) {
        for mut event in events {
            event.sequence = last_sequence.fetch_add(1, Ordering::SeqCst) + 1;

            let record = event.encode_record();
            if let Err(e) = file.write_all(record.as_bytes()) {
                tracing::warn!(sequence = event.sequence, error = %e, "log append failed");
                // 1-slot channel: drop the report if one is already pending.
                let _ = err_tx.try_send(KvError::Io(e));
            } else {
                tracing::trace!(
                    sequence = event.sequence,
                    kind = ?event.kind,
                    "committed event"
                );
            }

            // Decrement regardless of outcome so wait() cannot deadlock.
            pending.done();
        }
    }
}

impl TransactionLog for FileLog {
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
                let file = self.file.lock().take().ok_or(KvError::LogClosed)?;
                let (tx, rx) = bounded(EVENT_QUEUE_CAPACITY);

                let err_tx = self.err_tx.clone();
                let pending = Arc::clone(&self.pending);
                let last_sequence = Arc::clone(&self.last_sequence);
                let handle = thread::spawn(move || {
                    Self::commit_loop(file, rx, err_tx, pending, last_sequence);
                });

                *state = WriteState::Running(tx);
                *self.worker.lock() = Some(handle);
                tracing::debug!(path = %self.path.display(), "file log commit worker started");
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
            // Dropping the sender disconnects the channel; the worker drains
            // what is left and exits, releasing the file handle.
            *state = WriteState::Closed;
        }

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::warn!(path = %self.path.display(), "commit worker panicked during close");
            }
        }

        // Release the medium if run() was never called.
        self.file.lock().take();

        tracing::debug!(path = %self.path.display(), "file log closed");
        Ok(())
    }

    fn read_events(&self) -> (Receiver<Event>, Receiver<KvError>) {
        // Rendezvous event channel, 1-slot error channel: mirrors the
        // replay contract both backends share.
        let (event_tx, event_rx) = bounded(0);
        let (error_tx, error_rx) = bounded(ERROR_CHANNEL_CAPACITY);

        let path = self.path.clone();
        let last_sequence = Arc::clone(&self.last_sequence);

        thread::spawn(move || {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    let _ = error_tx.send(KvError::Io(e));
                    return;
                }
            };

            let mut validator = SequenceValidator::default();
            for line in BufReader::new(file).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        let _ = error_tx.send(KvError::Io(e));
                        return;
                    }
                };

                let event = match Event::decode_record(&line) {
                    Ok(event) => event,
                    Err(e) => {
                        let _ = error_tx.send(e);
                        return;
                    }
                };

                if let Err(e) = validator.check(event.sequence) {
                    let _ = error_tx.send(e);
                    return;
                }

                // Seed the generator so new commits continue the numbering.
                last_sequence.store(event.sequence, Ordering::SeqCst);

                if event_tx.send(event).is_err() {
                    // Consumer hung up; abort the scan.
                    return;
                }
            }
            // Dropping both senders closes the streams.
        });

        (event_rx, error_rx)
    }

    fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::SeqCst)
    }
}
