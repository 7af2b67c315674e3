//! `OperRouter` SDK
//!
//! Transport-neutral contract for talking to an operator router service:
//! - Capability trait (`OperRouterClient`)
//! - Request and response models
//! - Typed datasource and LLM configuration
//! - Mapping from configuration to wire descriptors, shared by adapters
//! - Error taxonomy (`OperRouterError`) and per-call deadlines (`CallContext`)
//!
//! ## Usage
//!
//! ```ignore
//! use operrouter_sdk::{CallContext, OperRouterClient};
//!
//! let client: Arc<dyn OperRouterClient> = /* HTTP, gRPC or FFI adapter */;
//! let pong = client.ping(&CallContext::background()).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

// === API TRAIT ===
mod api;
pub use api::OperRouterClient;

// === MODELS AND CONFIGURATION ===
pub mod config;
pub mod mapping;
pub mod models;

pub use config::{
    DataSourceConfig, HostConnection, KafkaConnection, LlmConfig, Params, SqlConnection,
};
pub use models::{
    ChatMessage, DataSourceDescriptor, DataSourceKind, DataSourceQueryResponse, DataSourceResponse,
    LlmDescriptor, LlmEmbeddingResponse, LlmGenerateResponse, LlmProvider, LlmResponse,
    LoadConfigResponse, MessageRole, MetadataResponse, PingResponse, Row, ValidateConfigResponse,
    Value,
};

// === ERRORS AND CONTEXT ===
mod context;
mod error;
pub use context::CallContext;
pub use error::{BoxError, OperRouterError, OperRouterResult};
