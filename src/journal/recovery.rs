//! Startup recovery
//!
//! Replays a transaction log into a keyspace, then switches the log into
//! live commit mode. Any decode or ordering error during replay is fatal:
//! serving must not start on top of a corrupt log.

use crossbeam::channel::never;
use crossbeam::select;

use crate::error::Result;
use crate::keyspace::Keyspace;

use super::event::EventKind;
use super::TransactionLog;

/// Outcome of a successful replay
#[derive(Debug, Default, Clone, Copy)]
pub struct RestoreReport {
    /// Number of events applied to the keyspace
    pub events_replayed: u64,

    /// Sequence number of the last replayed event (0 for an empty log)
    pub last_sequence: u64,
}

/// Replay `log` into `keyspace`, then call `run()` to make the log live.
///
/// Consumes the event and error streams concurrently via a fair select;
/// `run()` is only called after both streams have closed, so replay reads
/// never race against new commits.
pub fn restore(log: &dyn TransactionLog, keyspace: &Keyspace) -> Result<RestoreReport> {
    let (mut events, mut errors) = log.read_events();

    let mut events_open = true;
    let mut errors_open = true;
    let mut report = RestoreReport::default();

    while events_open || errors_open {
        select! {
            recv(events) -> msg => match msg {
                Ok(event) => {
                    match event.kind {
                        EventKind::Put => keyspace.put(&event.key, &event.value),
                        EventKind::Delete => keyspace.delete(&event.key),
                    }
                    report.events_replayed += 1;
                    report.last_sequence = event.sequence;
                }
                Err(_) => {
                    // Stream closed; stop selecting on it.
                    events_open = false;
                    events = never();
                }
            },
            recv(errors) -> msg => match msg {
                Ok(err) => return Err(err),
                Err(_) => {
                    errors_open = false;
                    errors = never();
                }
            },
        }
    }

    tracing::info!(
        events_replayed = report.events_replayed,
        last_sequence = report.last_sequence,
        "transaction log replay complete"
    );

    log.run()?;
    Ok(report)
}
