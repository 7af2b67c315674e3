//! Typed datasource and LLM configuration.
//!
//! Configuration is validated once, when the value is built, so adapters
//! never meet a missing or mistyped key while building a request. The
//! loose JSON form accepted by [`DataSourceConfig::from_params`] and
//! [`LlmConfig::from_params`] is the shape the service documents for its
//! JSON-RPC endpoint.

use serde_json::{Map, Value as JsonValue};

use crate::error::OperRouterError;
use crate::mapping;
use crate::models::{DataSourceKind, LlmProvider};

/// Loosely typed parameter bag, as accepted by the JSON-RPC endpoint.
pub type Params = Map<String, JsonValue>;

const DRIVER: &str = "driver";
const HOST: &str = "host";
const PORT: &str = "port";
const DATABASE: &str = "database";
const USERNAME: &str = "username";
const PASSWORD: &str = "password";
const BROKERS: &str = "brokers";

/// Connection settings for SQL drivers (postgres, mysql).
#[derive(Debug, Clone, PartialEq)]
pub struct SqlConnection {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Driver name as the caller spelled it, when it differs from the
    /// canonical one (`postgresql`, `mongo`). Forwarded verbatim.
    pub driver_alias: Option<String>,
    pub extra: Params,
}

impl SqlConnection {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            username: None,
            password: None,
            driver_alias: None,
            extra: Params::new(),
        }
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Connection settings for host/port drivers (redis, mongodb).
#[derive(Debug, Clone, PartialEq)]
pub struct HostConnection {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Driver name as the caller spelled it, when it differs from the
    /// canonical one (`postgresql`, `mongo`). Forwarded verbatim.
    pub driver_alias: Option<String>,
    pub extra: Params,
}

impl HostConnection {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            driver_alias: None,
            extra: Params::new(),
        }
    }

    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Connection settings for kafka.
#[derive(Debug, Clone, PartialEq)]
pub struct KafkaConnection {
    /// Comma-separated broker list, forwarded verbatim as the connection URL.
    pub brokers: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Driver name as the caller spelled it, when it differs from the
    /// canonical one (`postgresql`, `mongo`). Forwarded verbatim.
    pub driver_alias: Option<String>,
    pub extra: Params,
}

impl KafkaConnection {
    #[must_use]
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            username: None,
            password: None,
            driver_alias: None,
            extra: Params::new(),
        }
    }
}

/// Datasource configuration, one variant per driver family.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSourceConfig {
    Postgres(SqlConnection),
    MySql(SqlConnection),
    Redis(HostConnection),
    MongoDb(HostConnection),
    Kafka(KafkaConnection),
    /// Driver the SDK does not know. Forwarded as-is for the service to judge.
    Other { driver: String, params: Params },
}

impl DataSourceConfig {
    /// Build a typed configuration from a loose parameter bag.
    ///
    /// Keys the selected driver does not consume are kept as extras.
    ///
    /// # Errors
    ///
    /// Returns [`OperRouterError::InvalidConfig`] when `driver` or a key the
    /// driver requires is missing or has the wrong type.
    pub fn from_params(params: &Params) -> Result<Self, OperRouterError> {
        let driver = required_str(params, DRIVER)?;

        let config = match mapping::datasource_kind(&driver) {
            DataSourceKind::PostgreSql => {
                Self::Postgres(sql_connection(params, alias(&driver, "postgres"))?)
            }
            DataSourceKind::MySql => Self::MySql(sql_connection(params, alias(&driver, "mysql"))?),
            DataSourceKind::Redis => Self::Redis(host_connection(params, alias(&driver, "redis"))?),
            DataSourceKind::MongoDb => {
                Self::MongoDb(host_connection(params, alias(&driver, "mongodb"))?)
            }
            DataSourceKind::Kafka => Self::Kafka(KafkaConnection {
                brokers: required_str(params, BROKERS)?,
                username: optional_str(params, USERNAME)?,
                password: optional_str(params, PASSWORD)?,
                driver_alias: alias(&driver, "kafka"),
                extra: leftovers(params, &[DRIVER, BROKERS, USERNAME, PASSWORD]),
            }),
            DataSourceKind::Unspecified => Self::Other {
                driver,
                params: leftovers(params, &[DRIVER]),
            },
        };

        Ok(config)
    }

    /// Driver tag sent to the service.
    #[must_use]
    pub fn kind(&self) -> DataSourceKind {
        match self {
            Self::Postgres(_) => DataSourceKind::PostgreSql,
            Self::MySql(_) => DataSourceKind::MySql,
            Self::Redis(_) => DataSourceKind::Redis,
            Self::MongoDb(_) => DataSourceKind::MongoDb,
            Self::Kafka(_) => DataSourceKind::Kafka,
            Self::Other { .. } => DataSourceKind::Unspecified,
        }
    }

    /// Driver name as written in the loose form: the caller's spelling
    /// when one was given, the canonical name otherwise.
    #[must_use]
    pub fn driver(&self) -> &str {
        match self {
            Self::Postgres(c) => c.driver_alias.as_deref().unwrap_or("postgres"),
            Self::MySql(c) => c.driver_alias.as_deref().unwrap_or("mysql"),
            Self::Redis(c) => c.driver_alias.as_deref().unwrap_or("redis"),
            Self::MongoDb(c) => c.driver_alias.as_deref().unwrap_or("mongodb"),
            Self::Kafka(c) => c.driver_alias.as_deref().unwrap_or("kafka"),
            Self::Other { driver, .. } => driver,
        }
    }

    /// Render the loose parameter bag sent as JSON-RPC `params.config`.
    #[must_use]
    pub fn to_params(&self) -> Params {
        let mut out = Params::new();
        out.insert(DRIVER.to_owned(), self.driver().into());

        match self {
            Self::Postgres(c) | Self::MySql(c) => {
                out.insert(HOST.to_owned(), c.host.clone().into());
                out.insert(PORT.to_owned(), c.port.into());
                out.insert(DATABASE.to_owned(), c.database.clone().into());
                put_credentials(&mut out, c.username.as_ref(), c.password.as_ref());
                merge(&mut out, &c.extra);
            }
            Self::Redis(c) | Self::MongoDb(c) => {
                out.insert(HOST.to_owned(), c.host.clone().into());
                out.insert(PORT.to_owned(), c.port.into());
                put_credentials(&mut out, c.username.as_ref(), c.password.as_ref());
                merge(&mut out, &c.extra);
            }
            Self::Kafka(c) => {
                out.insert(BROKERS.to_owned(), c.brokers.clone().into());
                put_credentials(&mut out, c.username.as_ref(), c.password.as_ref());
                merge(&mut out, &c.extra);
            }
            Self::Other { params, .. } => merge(&mut out, params),
        }

        out
    }
}

/// LLM client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Provider name as given by the caller; unknown names are forwarded unchanged.
    pub provider_name: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Provider tuning knobs (temperature, `max_tokens`, ...). Only the
    /// JSON-RPC transport can carry them.
    pub options: Params,
}

impl LlmConfig {
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        let provider_name = provider.into();
        Self {
            provider: mapping::llm_provider(&provider_name),
            provider_name,
            model: model.into(),
            api_key: None,
            options: Params::new(),
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Build a typed configuration from a loose parameter bag.
    ///
    /// # Errors
    ///
    /// Returns [`OperRouterError::InvalidConfig`] when `provider` or `model`
    /// is missing, or when a known key has the wrong type.
    pub fn from_params(params: &Params) -> Result<Self, OperRouterError> {
        let provider_name = required_str(params, "provider")?;
        Ok(Self {
            provider: mapping::llm_provider(&provider_name),
            provider_name,
            model: required_str(params, "model")?,
            api_key: optional_str(params, "api_key")?,
            options: leftovers(params, &["provider", "model", "api_key"]),
        })
    }

    /// Render the loose parameter bag sent as JSON-RPC `params.config`.
    #[must_use]
    pub fn to_params(&self) -> Params {
        let mut out = Params::new();
        out.insert("provider".to_owned(), self.provider_name.clone().into());
        out.insert("model".to_owned(), self.model.clone().into());
        if let Some(key) = &self.api_key {
            out.insert("api_key".to_owned(), key.clone().into());
        }
        merge(&mut out, &self.options);
        out
    }
}

fn alias(driver: &str, canonical: &str) -> Option<String> {
    (driver != canonical).then(|| driver.to_owned())
}

fn sql_connection(
    params: &Params,
    driver_alias: Option<String>,
) -> Result<SqlConnection, OperRouterError> {
    Ok(SqlConnection {
        host: required_str(params, HOST)?,
        port: required_port(params)?,
        database: required_str(params, DATABASE)?,
        username: optional_str(params, USERNAME)?,
        password: optional_str(params, PASSWORD)?,
        driver_alias,
        extra: leftovers(params, &[DRIVER, HOST, PORT, DATABASE, USERNAME, PASSWORD]),
    })
}

fn host_connection(
    params: &Params,
    driver_alias: Option<String>,
) -> Result<HostConnection, OperRouterError> {
    Ok(HostConnection {
        host: required_str(params, HOST)?,
        port: required_port(params)?,
        username: optional_str(params, USERNAME)?,
        password: optional_str(params, PASSWORD)?,
        driver_alias,
        extra: leftovers(params, &[DRIVER, HOST, PORT, USERNAME, PASSWORD]),
    })
}

fn required_str(params: &Params, key: &str) -> Result<String, OperRouterError> {
    optional_str(params, key)?.ok_or_else(|| OperRouterError::invalid_config(key, "missing"))
}

fn optional_str(params: &Params, key: &str) -> Result<Option<String>, OperRouterError> {
    match params.get(key) {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(OperRouterError::invalid_config(
            key,
            format!("expected a string, got {other}"),
        )),
    }
}

/// Ports arrive as JSON integers, integral floats or numeric strings.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn required_port(params: &Params) -> Result<u16, OperRouterError> {
    let invalid = |reason: String| OperRouterError::invalid_config(PORT, reason);

    match params.get(PORT) {
        None | Some(JsonValue::Null) => Err(invalid("missing".to_owned())),
        Some(JsonValue::Number(n)) => {
            if let Some(u) = n.as_u64() {
                return u16::try_from(u).map_err(|_| invalid(format!("{u} is out of range")));
            }
            match n.as_f64() {
                Some(f)
                    if f.fract().abs() < f64::EPSILON && (0.0..=f64::from(u16::MAX)).contains(&f) =>
                {
                    Ok(f as u16)
                }
                _ => Err(invalid(format!("{n} is not a valid port"))),
            }
        }
        Some(JsonValue::String(s)) => s
            .trim()
            .parse::<u16>()
            .map_err(|e| invalid(format!("'{s}' is not a valid port: {e}"))),
        Some(other) => Err(invalid(format!("expected a number, got {other}"))),
    }
}

fn leftovers(params: &Params, consumed: &[&str]) -> Params {
    params
        .iter()
        .filter(|(k, _)| !consumed.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn put_credentials(out: &mut Params, username: Option<&String>, password: Option<&String>) {
    if let Some(u) = username {
        out.insert(USERNAME.to_owned(), u.clone().into());
    }
    if let Some(p) = password {
        out.insert(PASSWORD.to_owned(), p.clone().into());
    }
}

fn merge(out: &mut Params, extra: &Params) {
    for (k, v) in extra {
        out.entry(k.clone()).or_insert_with(|| v.clone());
    }
}
