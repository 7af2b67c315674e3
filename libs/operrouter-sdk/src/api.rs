//! Capability interface implemented by every transport adapter.

use async_trait::async_trait;

use crate::config::{DataSourceConfig, LlmConfig};
use crate::context::CallContext;
use crate::error::OperRouterError;
use crate::models::{
    ChatMessage, DataSourceQueryResponse, DataSourceResponse, LlmEmbeddingResponse,
    LlmGenerateResponse, LlmResponse, LoadConfigResponse, MetadataResponse, PingResponse, Row,
    ValidateConfigResponse,
};

/// Operator router client.
///
/// Each method is one request/response round trip. Implementations never
/// retry. A failure reported by the service itself (`success == false`) is
/// returned as `Ok` with the message filled in; `Err` is reserved for
/// transport and protocol failures.
#[async_trait]
pub trait OperRouterClient: Send + Sync {
    /// Health check of the service.
    async fn ping(&self, ctx: &CallContext) -> Result<PingResponse, OperRouterError>;

    /// Validate an operator configuration given as TOML text.
    async fn validate_config(
        &self,
        ctx: &CallContext,
        toml: &str,
    ) -> Result<ValidateConfigResponse, OperRouterError>;

    /// Ask the service to load an operator configuration from `path`.
    async fn load_config(
        &self,
        ctx: &CallContext,
        path: &str,
    ) -> Result<LoadConfigResponse, OperRouterError>;

    /// Operator metadata. A reply without metadata is
    /// [`OperRouterError::MissingField`].
    async fn get_metadata(&self, ctx: &CallContext) -> Result<MetadataResponse, OperRouterError>;

    async fn create_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        config: &DataSourceConfig,
    ) -> Result<DataSourceResponse, OperRouterError>;

    async fn query_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        query: &str,
    ) -> Result<DataSourceQueryResponse, OperRouterError>;

    async fn execute_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        statement: &str,
    ) -> Result<DataSourceResponse, OperRouterError>;

    /// Insert one row. An empty `table` lets the service pick its default.
    async fn insert_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        table: &str,
        data: &Row,
    ) -> Result<DataSourceResponse, OperRouterError>;

    async fn ping_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<DataSourceResponse, OperRouterError>;

    async fn close_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<DataSourceResponse, OperRouterError>;

    async fn create_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        config: &LlmConfig,
    ) -> Result<LlmResponse, OperRouterError>;

    async fn generate_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        prompt: &str,
    ) -> Result<LlmGenerateResponse, OperRouterError>;

    /// Chat completion. Message order is preserved.
    async fn chat_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        messages: &[ChatMessage],
    ) -> Result<LlmGenerateResponse, OperRouterError>;

    async fn embedding_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        text: &str,
    ) -> Result<LlmEmbeddingResponse, OperRouterError>;

    async fn ping_llm(&self, ctx: &CallContext, name: &str) -> Result<LlmResponse, OperRouterError>;

    async fn close_llm(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<LlmResponse, OperRouterError>;

    /// Release the adapter's resources. Calling it more than once is harmless.
    async fn close(&self) -> Result<(), OperRouterError>;
}
