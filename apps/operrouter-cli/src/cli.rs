use std::path::PathBuf;

use clap::Parser;

use crate::commands::Command;
use crate::config::CliOverrides;

/// OperRouter client - talk to an operator router over HTTP, gRPC or FFI
#[derive(Debug, Parser)]
#[command(name = "operrouter-cli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Transport override: http, grpc or ffi
    #[arg(short, long, global = true)]
    pub transport: Option<String>,

    /// Endpoint override for http and grpc
    #[arg(short, long, global = true)]
    pub endpoint: Option<String>,

    /// Shared library override for ffi
    #[arg(short, long, global = true)]
    pub library: Option<PathBuf>,

    /// Per-call timeout override in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            transport: self.transport.clone(),
            endpoint: self.endpoint.clone(),
            library: self.library.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}
