//! gRPC client transport configuration and connection utilities.
//!
//! Covers connect and per-call timeouts, HTTP/2 keepalive and a tracing
//! span around connection establishment. Connections are made once; there
//! is no retry or backoff at this layer.

use std::time::Duration;

use operrouter_proto::SERVICE_NAME;
use operrouter_sdk::OperRouterError;
use tonic::transport::{Channel, Endpoint};
use tracing::Instrument;

fn duration_to_i64_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Configuration for the gRPC client transport stack.
#[derive(Debug, Clone)]
pub struct GrpcClientConfig {
    /// Timeout for establishing the initial connection.
    pub connect_timeout: Duration,

    /// Default timeout for a single RPC when the call context has no deadline.
    pub rpc_timeout: Duration,

    /// Service name for tracing.
    pub service_name: &'static str,

    /// Emit an `info` event once connected.
    pub enable_tracing: bool,
}

impl Default for GrpcClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            rpc_timeout: Duration::from_secs(5),
            service_name: SERVICE_NAME,
            enable_tracing: true,
        }
    }
}

impl GrpcClientConfig {
    /// Create a new configuration with the given service name.
    #[must_use]
    pub fn new(service_name: &'static str) -> Self {
        Self {
            service_name,
            ..Default::default()
        }
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the default RPC timeout.
    #[must_use]
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Disable tracing.
    #[must_use]
    pub fn without_tracing(mut self) -> Self {
        self.enable_tracing = false;
        self
    }
}

/// Accept bare `host:port` addresses as well as full URIs.
pub(crate) fn normalize_uri(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.contains("://") {
        trimmed.to_owned()
    } else {
        format!("http://{trimmed}")
    }
}

/// Build a tonic `Endpoint` with connect timeout and keepalive settings.
///
/// No endpoint-wide request timeout is set: every call carries its own.
pub(crate) fn build_endpoint(
    uri: String,
    cfg: &GrpcClientConfig,
) -> Result<Endpoint, tonic::transport::Error> {
    let endpoint = Endpoint::from_shared(uri)?
        .connect_timeout(cfg.connect_timeout)
        .tcp_keepalive(Some(Duration::from_secs(30)))
        .http2_keep_alive_interval(Duration::from_secs(30))
        .keep_alive_timeout(Duration::from_secs(10))
        .keep_alive_while_idle(true);

    Ok(endpoint)
}

/// Connect to the service with the configured transport stack.
///
/// The connection is established eagerly so an unreachable address fails
/// here rather than on the first call.
///
/// # Errors
///
/// [`OperRouterError::InvalidConfig`] for a malformed address,
/// [`OperRouterError::Transport`] when the connection cannot be made.
pub async fn connect_with_stack<TClient>(
    address: &str,
    cfg: &GrpcClientConfig,
) -> Result<TClient, OperRouterError>
where
    TClient: From<Channel>,
{
    let uri_string = normalize_uri(address);
    let span = tracing::debug_span!(
        "grpc_connect",
        service = cfg.service_name,
        uri = %uri_string
    );

    async move {
        let endpoint = build_endpoint(uri_string, cfg)
            .map_err(|e| OperRouterError::invalid_config("endpoint", e.to_string()))?;
        let channel = endpoint.connect().await.map_err(OperRouterError::transport)?;

        if cfg.enable_tracing {
            let connect_timeout_ms = duration_to_i64_ms(cfg.connect_timeout);
            let rpc_timeout_ms = duration_to_i64_ms(cfg.rpc_timeout);
            tracing::info!(
                service_name = cfg.service_name,
                connect_timeout_ms,
                rpc_timeout_ms,
                "gRPC client connected"
            );
        }

        Ok(TClient::from(channel))
    }
    .instrument(span)
    .await
}
