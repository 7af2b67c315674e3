//! Transport selection.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use operrouter_ffi::FfiClient;
use operrouter_grpc::{GrpcClient, GrpcClientConfig};
use operrouter_http::{HttpClient, HttpClientConfig};
use operrouter_sdk::OperRouterClient;

use crate::config::TransportConfig;

/// Build the adapter selected by `cfg`.
///
/// # Errors
///
/// Fails when the adapter cannot be built: a bad endpoint, an unreachable
/// gRPC server or a library that does not load.
pub async fn connect(cfg: &TransportConfig) -> Result<Arc<dyn OperRouterClient>> {
    let client: Arc<dyn OperRouterClient> = match cfg {
        TransportConfig::Http { endpoint, timeout_ms } => {
            let http_cfg = HttpClientConfig::new(endpoint.as_str())
                .with_request_timeout(Duration::from_millis(*timeout_ms));
            Arc::new(HttpClient::with_config(http_cfg).context("failed to build HTTP client")?)
        }
        TransportConfig::Grpc {
            endpoint,
            connect_timeout_ms,
            rpc_timeout_ms,
        } => {
            let grpc_cfg = GrpcClientConfig::default()
                .with_connect_timeout(Duration::from_millis(*connect_timeout_ms))
                .with_rpc_timeout(Duration::from_millis(*rpc_timeout_ms));
            let client = GrpcClient::connect_with_config(endpoint, grpc_cfg)
                .await
                .with_context(|| format!("failed to connect to {endpoint}"))?;
            Arc::new(client)
        }
        TransportConfig::Ffi { library } => Arc::new(
            FfiClient::open(library)
                .with_context(|| format!("failed to load {}", library.display()))?,
        ),
    };

    tracing::info!(transport = cfg.kind(), "client ready");
    Ok(client)
}
