use anyhow::Result;
use clap::Subcommand;
use operrouter_sdk::config::Params;
use operrouter_sdk::{CallContext, DataSourceConfig, OperRouterClient, Row, Value};
use serde_json::Value as JsonValue;

use super::{Report, json_or_string, parse_key_value, split_key_value};

/// Connection keys whose values are always text, even when they look
/// like numbers (`password=12345`, `database=2024`).
const TEXT_KEYS: &[&str] = &["driver", "host", "database", "username", "password", "brokers"];

#[derive(Debug, Clone, Subcommand)]
pub enum DataSourceCommand {
    /// Register a datasource
    Create {
        name: String,
        /// postgres, mysql, redis, mongodb, kafka or any driver the router knows
        #[arg(long)]
        driver: String,
        /// Connection parameter, repeatable (`host=db`, `port=5432`)
        #[arg(long = "param", value_parser = split_key_value)]
        params: Vec<(String, String)>,
    },
    /// Run a query and print the rows
    Query { name: String, query: String },
    /// Run a statement
    Execute { name: String, statement: String },
    /// Insert one row
    Insert {
        name: String,
        #[arg(long, default_value = "")]
        table: String,
        /// Column value, repeatable (`id=42`, `name=alice`)
        #[arg(long = "column", value_parser = parse_key_value)]
        columns: Vec<(String, JsonValue)>,
    },
    /// Health check of a datasource
    Ping { name: String },
    /// Release a datasource
    Close { name: String },
}

impl DataSourceCommand {
    pub(super) async fn run(
        &self,
        client: &dyn OperRouterClient,
        ctx: &CallContext,
    ) -> Result<Report> {
        let resp = match self {
            Self::Create { name, driver, params } => {
                let config = DataSourceConfig::from_params(&connection_params(driver, params))?;
                client.create_datasource(ctx, name, &config).await?
            }
            Self::Query { name, query } => {
                let resp = client.query_datasource(ctx, name, query).await?;
                return Report::new(&resp, resp.success);
            }
            Self::Execute { name, statement } => {
                client.execute_datasource(ctx, name, statement).await?
            }
            Self::Insert { name, table, columns } => {
                let row: Row = columns
                    .iter()
                    .map(|(column, value)| (column.clone(), Value::from(value.clone())))
                    .collect();
                if row.is_empty() {
                    anyhow::bail!("insert needs at least one --column");
                }
                client.insert_datasource(ctx, name, table, &row).await?
            }
            Self::Ping { name } => client.ping_datasource(ctx, name).await?,
            Self::Close { name } => client.close_datasource(ctx, name).await?,
        };

        Report::new(&resp, resp.success)
    }
}

/// Build the loose parameter bag. Text keys stay strings; any other value
/// is read as JSON when it parses.
fn connection_params(driver: &str, params: &[(String, String)]) -> Params {
    let mut bag: Params = params
        .iter()
        .map(|(key, value)| {
            let value = if TEXT_KEYS.contains(&key.as_str()) {
                JsonValue::String(value.clone())
            } else {
                json_or_string(value)
            };
            (key.clone(), value)
        })
        .collect();
    bag.insert("driver".to_owned(), JsonValue::String(driver.to_owned()));
    bag
}
