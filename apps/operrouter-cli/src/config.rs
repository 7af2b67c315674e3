//! Layered CLI configuration.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults,
//! 2. the YAML file given with `--config`,
//! 3. environment variables `OPERROUTER__*` (`__` separates nesting levels),
//! 4. command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Environment prefix of configuration overrides.
pub const ENV_PREFIX: &str = "OPERROUTER__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Transport selection and its settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
    Http {
        #[serde(default = "default_http_endpoint")]
        endpoint: String,
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
    },
    Grpc {
        #[serde(default = "default_grpc_endpoint")]
        endpoint: String,
        #[serde(default = "default_connect_timeout_ms")]
        connect_timeout_ms: u64,
        #[serde(default = "default_rpc_timeout_ms")]
        rpc_timeout_ms: u64,
    },
    Ffi {
        #[serde(default = "default_library")]
        library: PathBuf,
    },
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::Http {
            endpoint: default_http_endpoint(),
            timeout_ms: default_http_timeout_ms(),
        }
    }
}

fn default_http_endpoint() -> String {
    "http://127.0.0.1:8080".to_owned()
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_grpc_endpoint() -> String {
    "http://127.0.0.1:50051".to_owned()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_rpc_timeout_ms() -> u64 {
    5_000
}

fn default_library() -> PathBuf {
    PathBuf::from("liboperrouter_core.so")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when neither `RUST_LOG` nor `-v` is given.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_owned()
}

/// Command-line overrides, applied on top of every other source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub transport: Option<String>,
    pub endpoint: Option<String>,
    pub library: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
}

impl AppConfig {
    /// Load defaults, then `path` (if any), then the environment.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not exist or a source does not deserialize.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.is_file() {
                bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }

    /// Apply command-line flags.
    ///
    /// Switching the transport kind starts from that kind's defaults;
    /// `--endpoint` and `--library` only apply to kinds that use them.
    ///
    /// # Errors
    ///
    /// Fails on an unknown transport name.
    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) -> Result<()> {
        if let Some(kind) = overrides.transport.as_deref()
            && kind != self.transport.kind()
        {
            self.transport = TransportConfig::defaults_for(kind)?;
        }

        match &mut self.transport {
            TransportConfig::Http { endpoint, timeout_ms } => {
                if let Some(value) = &overrides.endpoint {
                    endpoint.clone_from(value);
                }
                if let Some(value) = overrides.timeout_ms {
                    *timeout_ms = value;
                }
            }
            TransportConfig::Grpc {
                endpoint,
                rpc_timeout_ms,
                ..
            } => {
                if let Some(value) = &overrides.endpoint {
                    endpoint.clone_from(value);
                }
                if let Some(value) = overrides.timeout_ms {
                    *rpc_timeout_ms = value;
                }
            }
            TransportConfig::Ffi { library } => {
                if let Some(value) = &overrides.library {
                    library.clone_from(value);
                }
            }
        }

        Ok(())
    }
}

impl TransportConfig {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Grpc { .. } => "grpc",
            Self::Ffi { .. } => "ffi",
        }
    }

    /// Default settings of the transport named `kind`.
    ///
    /// # Errors
    ///
    /// Fails on an unknown transport name.
    pub fn defaults_for(kind: &str) -> Result<Self> {
        match kind {
            "http" => Ok(Self::default()),
            "grpc" => Ok(Self::Grpc {
                endpoint: default_grpc_endpoint(),
                connect_timeout_ms: default_connect_timeout_ms(),
                rpc_timeout_ms: default_rpc_timeout_ms(),
            }),
            "ffi" => Ok(Self::Ffi {
                library: default_library(),
            }),
            other => bail!("unknown transport '{other}' (expected http, grpc or ffi)"),
        }
    }
}
