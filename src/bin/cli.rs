//! JournalKV CLI Client
//!
//! Command-line interface for interacting with a JournalKV server.

use std::net::TcpStream;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use journalkv::protocol::{read_response, write_command, Command, Status};

/// JournalKV CLI
#[derive(Parser, Debug)]
#[command(name = "journalkv-cli")]
#[command(about = "CLI for the JournalKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Ping the server
    Ping,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let command = match args.command {
        Commands::Get { key } => Command::Get { key },
        Commands::Set { key, value } => Command::Put { key, value },
        Commands::Del { key } => Command::Delete { key },
        Commands::Ping => Command::Ping,
    };

    let response = TcpStream::connect(&args.server)
        .map_err(journalkv::KvError::Io)
        .and_then(|mut stream| {
            write_command(&mut stream, &command)?;
            read_response(&mut stream)
        });

    match response {
        Ok(response) => match response.status {
            Status::Ok => {
                println!("{}", response.payload.as_deref().unwrap_or("OK"));
                ExitCode::SUCCESS
            }
            Status::NotFound => {
                eprintln!("(not found)");
                ExitCode::FAILURE
            }
            Status::Error => {
                eprintln!("error: {}", response.payload.as_deref().unwrap_or("unknown"));
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
