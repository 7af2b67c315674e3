//! One subcommand per client operation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use operrouter_sdk::{CallContext, OperRouterClient};
use serde::Serialize;
use serde_json::Value as JsonValue;

mod datasource;
mod llm;

pub use datasource::DataSourceCommand;
pub use llm::LlmCommand;

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Health check of the router
    Ping,
    /// Validate an operator configuration file
    ValidateConfig {
        /// TOML file to send
        file: PathBuf,
    },
    /// Ask the router to load an operator configuration
    LoadConfig {
        /// Path as seen by the router
        path: String,
    },
    /// Show operator metadata
    Metadata,
    /// Datasource operations
    #[command(subcommand)]
    Datasource(DataSourceCommand),
    /// LLM operations
    #[command(subcommand)]
    Llm(LlmCommand),
    /// Print the effective configuration and exit
    PrintConfig,
}

/// Outcome of one command: the response as JSON and whether the router
/// reported success.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub body: JsonValue,
    pub success: bool,
}

impl Report {
    pub(crate) fn new<T: Serialize>(response: &T, success: bool) -> Result<Self> {
        Ok(Self {
            body: serde_json::to_value(response).context("failed to render response")?,
            success,
        })
    }
}

impl Command {
    /// `true` for commands answered without contacting the router.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::PrintConfig)
    }

    /// Run the command against `client`.
    ///
    /// # Errors
    ///
    /// Adapter errors, unreadable input files and malformed arguments.
    pub async fn run(&self, client: &dyn OperRouterClient, ctx: &CallContext) -> Result<Report> {
        match self {
            Self::Ping => Report::new(&client.ping(ctx).await?, true),
            Self::ValidateConfig { file } => {
                let toml = std::fs::read_to_string(file)
                    .with_context(|| format!("failed to read {}", file.display()))?;
                let resp = client.validate_config(ctx, &toml).await?;
                Report::new(&resp, resp.valid)
            }
            Self::LoadConfig { path } => {
                let resp = client.load_config(ctx, path).await?;
                Report::new(&resp, resp.success)
            }
            Self::Metadata => Report::new(&client.get_metadata(ctx).await?, true),
            Self::Datasource(cmd) => cmd.run(client, ctx).await,
            Self::Llm(cmd) => cmd.run(client, ctx).await,
            Self::PrintConfig => anyhow::bail!("print-config does not contact the router"),
        }
    }
}

/// Split `key=value`, keeping the value as typed.
pub(crate) fn split_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_owned(), value.to_owned()))
}

/// Parse `key=value`; the value is read as JSON when it parses, else kept
/// as a string.
pub(crate) fn parse_key_value(raw: &str) -> Result<(String, JsonValue), String> {
    let (key, value) = split_key_value(raw)?;
    Ok((key, json_or_string(&value)))
}

pub(crate) fn json_or_string(value: &str) -> JsonValue {
    serde_json::from_str(value).unwrap_or_else(|_| JsonValue::String(value.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_value_reads_json_scalars() {
        assert_eq!(parse_key_value("port=5432").unwrap(), ("port".to_owned(), json!(5432)));
        assert_eq!(parse_key_value("ssl=true").unwrap(), ("ssl".to_owned(), json!(true)));
        assert_eq!(
            parse_key_value("host=localhost").unwrap(),
            ("host".to_owned(), json!("localhost"))
        );
        assert_eq!(parse_key_value("brokers=b1:9092,b2:9092").unwrap().1, json!("b1:9092,b2:9092"));
        assert_eq!(parse_key_value("empty=").unwrap().1, json!(""));
    }

    #[test]
    fn split_keeps_value_text() {
        assert_eq!(
            split_key_value("password=12345").unwrap(),
            ("password".to_owned(), "12345".to_owned())
        );
        assert_eq!(split_key_value("dsn=a=b").unwrap().1, "a=b");
    }

    #[test]
    fn key_value_rejects_malformed() {
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
