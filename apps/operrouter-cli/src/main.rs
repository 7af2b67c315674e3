use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use operrouter_cli::{AppConfig, Cli, logging, run_command, wiring};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (OPERROUTER__*) -> 4) CLI overrides
    let mut config = AppConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(&cli.overrides())?;

    logging::init_logging(&config.logging, cli.verbose);

    if cli.command.is_local() {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    tracing::debug!(transport = config.transport.kind(), command = ?cli.command, "running command");

    let client = wiring::connect(&config.transport).await?;
    let report = run_command(client.as_ref(), &cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&report.body)?);

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
