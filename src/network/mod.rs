//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One worker thread per connection, capped by config
//! - Commands routed through Engine

mod connection;
mod server;

pub use connection::Connection;
pub use server::Server;
