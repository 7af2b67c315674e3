//! Command-line harness for the `OperRouter` client SDK.
//!
//! Loads layered configuration, installs logging, builds the selected
//! adapter and runs one operation, printing the response as JSON.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod wiring;

use anyhow::Result;
use operrouter_sdk::{CallContext, OperRouterClient};

pub use cli::Cli;
pub use commands::{Command, Report};
pub use config::AppConfig;

/// Run `command` on `client`, then close the client.
///
/// # Errors
///
/// The command's error. A failing close is only logged.
pub async fn run_command(client: &dyn OperRouterClient, command: &Command) -> Result<Report> {
    let ctx = CallContext::background();
    let report = command.run(client, &ctx).await;

    if let Err(e) = client.close().await {
        tracing::warn!(error = %e, "failed to close client");
    }

    report
}
