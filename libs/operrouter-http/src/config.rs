//! HTTP adapter configuration.

use std::time::Duration;

/// Default User-Agent header value.
pub const DEFAULT_USER_AGENT: &str = concat!("operrouter-sdk/", env!("CARGO_PKG_VERSION"));

/// Configuration for [`crate::HttpClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Service base URL, e.g. `http://localhost:8080`. The adapter posts to
    /// `<base_url>/jsonrpc`.
    pub base_url: String,

    /// Per-request timeout when the call context has no deadline (default: 10 seconds).
    pub request_timeout: Duration,

    /// TCP connect timeout (default: 5 seconds).
    pub connect_timeout: Duration,

    /// User-Agent header value.
    pub user_agent: String,
}

impl HttpClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// JSON-RPC endpoint derived from the base URL.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/jsonrpc", self.base_url.trim_end_matches('/'))
    }
}
