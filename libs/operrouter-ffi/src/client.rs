//! FFI implementation of [`OperRouterClient`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use operrouter_proto::{convert, v1};
use operrouter_sdk::{
    CallContext, ChatMessage, DataSourceConfig, DataSourceQueryResponse, DataSourceResponse,
    LlmConfig, LlmEmbeddingResponse, LlmGenerateResponse, LlmResponse, LoadConfigResponse,
    MetadataResponse, OperRouterClient, OperRouterError, PingResponse, Row, ValidateConfigResponse,
};
use parking_lot::Mutex;
use prost::Message;

use crate::abi::{self, symbols};
use crate::library::{DynamicLibrary, ProtoLibrary};

/// Adapter calling a router linked into the process.
///
/// Native calls run on tokio's blocking pool. A deadline is checked before
/// the call starts; a call already running inside the library is not
/// interrupted.
pub struct FfiClient<L: ProtoLibrary = DynamicLibrary> {
    library: Mutex<Option<Arc<L>>>,
}

impl FfiClient<DynamicLibrary> {
    /// Load the shared library at `path`.
    ///
    /// # Errors
    ///
    /// [`OperRouterError::LibraryLoad`] with the loader's diagnostic.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OperRouterError> {
        Ok(Self::new(DynamicLibrary::open(path)?))
    }
}

impl<L: ProtoLibrary> FfiClient<L> {
    #[must_use]
    pub fn new(library: L) -> Self {
        Self {
            library: Mutex::new(Some(Arc::new(library))),
        }
    }

    fn library(&self) -> Result<Arc<L>, OperRouterError> {
        self.library.lock().clone().ok_or(OperRouterError::Closed)
    }

    async fn call<Req, Resp>(
        &self,
        ctx: &CallContext,
        symbol: &'static str,
        request: &Req,
    ) -> Result<Resp, OperRouterError>
    where
        Req: Message,
        Resp: Message + Default,
    {
        ctx.check()?;
        let library = self.library()?;
        let input = request.encode_to_vec();
        tracing::debug!(symbol, request_len = input.len(), "FFI call");

        // The closure owns an `Arc` to the library, keeping it loaded until
        // the native call returns even if the client is closed meanwhile.
        let output = tokio::task::spawn_blocking(move || {
            let entry = library.resolve(symbol)?;
            let free = library.free_fn()?;
            // SAFETY: `L: ProtoLibrary` guarantees that `entry` and `free`
            // honour the ABI and stay callable while `library` is alive.
            unsafe { abi::invoke(entry, free, &input) }
        })
        .await
        .map_err(OperRouterError::transport)??;

        Resp::decode(output.as_slice())
            .map_err(|e| OperRouterError::Protocol(format!("failed to decode {symbol} reply: {e}")))
    }
}

#[async_trait]
impl<L: ProtoLibrary> OperRouterClient for FfiClient<L> {
    async fn ping(&self, ctx: &CallContext) -> Result<PingResponse, OperRouterError> {
        let reply: v1::PingResponse = self.call(ctx, symbols::PING, &v1::PingRequest {}).await?;
        Ok(reply.into())
    }

    async fn validate_config(
        &self,
        ctx: &CallContext,
        toml: &str,
    ) -> Result<ValidateConfigResponse, OperRouterError> {
        let req = convert::validate_config_request(toml);
        let reply: v1::ValidateConfigResponse =
            self.call(ctx, symbols::VALIDATE_CONFIG, &req).await?;
        Ok(reply.into())
    }

    async fn load_config(
        &self,
        ctx: &CallContext,
        path: &str,
    ) -> Result<LoadConfigResponse, OperRouterError> {
        let req = convert::load_config_request(path);
        let reply: v1::LoadConfigResponse = self.call(ctx, symbols::LOAD_CONFIG, &req).await?;
        Ok(reply.into())
    }

    async fn get_metadata(&self, ctx: &CallContext) -> Result<MetadataResponse, OperRouterError> {
        let reply: v1::GetMetadataResponse = self
            .call(ctx, symbols::GET_METADATA, &v1::GetMetadataRequest {})
            .await?;
        reply.try_into()
    }

    async fn create_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        config: &DataSourceConfig,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let req = convert::create_datasource_request(name, config);
        let reply: v1::CreateDataSourceResponse =
            self.call(ctx, symbols::DATASOURCE_CREATE, &req).await?;
        Ok(reply.into())
    }

    async fn query_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        query: &str,
    ) -> Result<DataSourceQueryResponse, OperRouterError> {
        let req = convert::query_datasource_request(name, query);
        let reply: v1::QueryDataSourceResponse =
            self.call(ctx, symbols::DATASOURCE_QUERY, &req).await?;
        Ok(reply.into())
    }

    async fn execute_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        statement: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let req = convert::execute_datasource_request(name, statement);
        let reply: v1::ExecuteDataSourceResponse =
            self.call(ctx, symbols::DATASOURCE_EXECUTE, &req).await?;
        tracing::debug!(name, rows_affected = reply.rows_affected, "statement executed");
        Ok(reply.into())
    }

    async fn insert_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        table: &str,
        data: &Row,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let req = convert::insert_datasource_request(name, table, data);
        let reply: v1::InsertDataSourceResponse =
            self.call(ctx, symbols::DATASOURCE_INSERT, &req).await?;
        Ok(reply.into())
    }

    async fn ping_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let req = convert::ping_datasource_request(name);
        let reply: v1::PingDataSourceResponse =
            self.call(ctx, symbols::DATASOURCE_PING, &req).await?;
        Ok(reply.into())
    }

    async fn close_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let req = convert::close_datasource_request(name);
        let reply: v1::CloseDataSourceResponse =
            self.call(ctx, symbols::DATASOURCE_CLOSE, &req).await?;
        Ok(reply.into())
    }

    async fn create_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        config: &LlmConfig,
    ) -> Result<LlmResponse, OperRouterError> {
        if !config.options.is_empty() {
            tracing::debug!(name, "LLM options are not carried over FFI");
        }
        let req = convert::create_llm_request(name, config);
        let reply: v1::CreateLlmResponse = self.call(ctx, symbols::LLM_CREATE, &req).await?;
        Ok(reply.into())
    }

    async fn generate_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        prompt: &str,
    ) -> Result<LlmGenerateResponse, OperRouterError> {
        let req = convert::generate_llm_request(name, prompt);
        let reply: v1::GenerateLlmResponse = self.call(ctx, symbols::LLM_GENERATE, &req).await?;
        Ok(reply.into())
    }

    async fn chat_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        messages: &[ChatMessage],
    ) -> Result<LlmGenerateResponse, OperRouterError> {
        let req = convert::chat_llm_request(name, messages);
        let reply: v1::ChatLlmResponse = self.call(ctx, symbols::LLM_CHAT, &req).await?;
        Ok(reply.into())
    }

    async fn embedding_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        text: &str,
    ) -> Result<LlmEmbeddingResponse, OperRouterError> {
        let req = convert::embedding_llm_request(name, text);
        let reply: v1::EmbeddingLlmResponse = self.call(ctx, symbols::LLM_EMBEDDING, &req).await?;
        Ok(reply.into())
    }

    async fn ping_llm(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<LlmResponse, OperRouterError> {
        let req = convert::ping_llm_request(name);
        let reply: v1::PingLlmResponse = self.call(ctx, symbols::LLM_PING, &req).await?;
        Ok(reply.into())
    }

    async fn close_llm(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<LlmResponse, OperRouterError> {
        let req = convert::close_llm_request(name);
        let reply: v1::CloseLlmResponse = self.call(ctx, symbols::LLM_CLOSE, &req).await?;
        Ok(reply.into())
    }

    async fn close(&self) -> Result<(), OperRouterError> {
        let Some(library) = self.library.lock().take() else {
            return Ok(());
        };

        match Arc::try_unwrap(library) {
            Ok(library) => library.unload(),
            Err(_) => {
                tracing::debug!("native calls in flight; library is released when they return");
                Ok(())
            }
        }
    }
}
