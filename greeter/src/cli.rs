//! # CLI
//!
//! This module defines the command-line interface of `greeter` using `clap`.
//!
//! It is responsible for parsing user input and performing validation (e.g., ensuring headers are `key:value`).
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "greeter", version, about = "helloworld.Greeter gRPC client and server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a Greeter server
    ///
    /// The server replies to `SayHello` with the prefix followed by the caller's name
    /// and stops on Ctrl-C.
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// greeter serve --addr 0.0.0.0:50051 --reflection
    /// ```
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:50051")]
        addr: SocketAddr,
        /// Text prepended to the name in every reply
        #[arg(long, default_value = "Hello ")]
        prefix: String,
        /// Also expose the gRPC Server Reflection service
        #[arg(long)]
        reflection: bool,
    },

    /// Send a single SayHello request
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// greeter hello http://localhost:50051 --name Ferris -H x-user:ferris
    /// ```
    Hello {
        /// The server URL to connect to (e.g. http://localhost:50051)
        url: String,
        #[command(flatten)]
        call: CallArgs,
        /// Use the blocking client stub (Ctrl-C still cancels the call)
        #[arg(long)]
        blocking: bool,
    },

    /// Measure SayHello round-trip latency
    ///
    /// Issues sequential calls and prints min, quartiles and max. The full report can be
    /// written as CSV.
    Bench {
        /// The server URL to connect to (e.g. http://localhost:50051)
        url: String,
        #[command(flatten)]
        call: CallArgs,
        /// Number of calls to measure
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        attempts: u32,
        /// Write the full report as CSV to this file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Arguments shared by every command issuing calls.
#[derive(clap::Args, Debug)]
pub struct CallArgs {
    /// Name sent in the request
    #[arg(long, default_value = "world")]
    pub name: String,

    /// Deadline of each call in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}
