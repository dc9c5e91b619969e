//! Command-line interface for proto2json
//!
//! # Usage Examples
//!
//! ## Single message
//! ```bash
//! proto2json --proto-path ./protos --type demo.Person < person.bin
//! ```
//!
//! ## Envelope stream
//! ```bash
//! # Each input line looks like {"key":"k1","value":"CgNBZGEQHg=="}
//! proto2json --proto-path ./protos --type demo.Person --kt-stream < records.jsonl
//! ```
//!
//! ## Without protoc
//! ```bash
//! proto2json --proto-path ./protos --type demo.Person --compiler builtin < person.bin
//! ```
//!
//! Logs go to stderr and are controlled by `RUST_LOG`; stdout only carries JSON.

use anyhow::Context;
use clap::Parser;
use proto2json::Config;
use std::io::BufWriter;

#[derive(Parser)]
#[command(name = "proto2json")]
#[command(version)]
#[command(about = "Convert binary protobuf messages to JSON using .proto files resolved at runtime")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,
}

fn main() -> anyhow::Result<()> {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;

    let stdin = std::io::stdin().lock();
    let stdout = BufWriter::new(std::io::stdout().lock());

    proto2json::run(&config, stdin, stdout)
        .with_context(|| format!("Failed to convert {} messages", config.message_type))
}
