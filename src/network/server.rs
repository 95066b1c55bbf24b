//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;

use super::Connection;

/// TCP server for JournalKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    shutdown: Arc<AtomicBool>,
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    /// Create a new server with the given config and engine
    pub fn new(config: Config, engine: Arc<Engine>) -> Self {
        Self {
            config,
            engine,
            shutdown: Arc::new(AtomicBool::new(false)),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start the server (blocking)
    ///
    /// One acceptor thread (this one), one worker thread per connection,
    /// capped at `max_connections`. Returns after [`shutdown`](Self::shutdown)
    /// is called.
    pub fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)?;
        tracing::info!(addr = %self.config.listen_addr, "server listening");

        for stream in listener.incoming() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    continue;
                }
            };

            if self.active_connections.load(Ordering::Relaxed) >= self.config.max_connections {
                tracing::warn!(
                    max = self.config.max_connections,
                    "connection limit reached, rejecting client"
                );
                drop(stream);
                continue;
            }

            self.spawn_handler(stream);
        }

        tracing::info!("server stopped accepting connections");
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    ///
    /// Sets the flag and pokes the listener so the accept loop observes it.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = TcpStream::connect(&self.config.listen_addr);
    }

    fn spawn_handler(&self, stream: TcpStream) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);

        let engine = Arc::clone(&self.engine);
        let active = Arc::clone(&self.active_connections);
        let read_timeout_ms = self.config.read_timeout_ms;
        let write_timeout_ms = self.config.write_timeout_ms;

        thread::spawn(move || {
            match Connection::new(stream, engine) {
                Ok(mut conn) => {
                    if let Err(e) = conn.set_timeouts(read_timeout_ms, write_timeout_ms) {
                        tracing::warn!(error = %e, "failed to configure connection timeouts");
                    } else if let Err(e) = conn.handle() {
                        tracing::warn!(peer = %conn.peer_addr(), error = %e, "connection error");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to set up connection"),
            }

            active.fetch_sub(1, Ordering::Relaxed);
        });
    }
}
