//! `OperRouter` HTTP adapter
//!
//! Implements [`operrouter_sdk::OperRouterClient`] as JSON-RPC 2.0 calls
//! posted to `<base_url>/jsonrpc`.
//!
//! ```ignore
//! use operrouter_http::HttpClient;
//! use operrouter_sdk::{CallContext, OperRouterClient};
//!
//! let client = HttpClient::new("http://localhost:8080")?;
//! let pong = client.ping(&CallContext::background()).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

mod client;
pub mod config;
mod wire;

pub use client::HttpClient;
pub use config::{DEFAULT_USER_AGENT, HttpClientConfig};
