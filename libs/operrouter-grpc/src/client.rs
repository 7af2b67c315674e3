//! gRPC implementation of [`OperRouterClient`].

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use operrouter_proto::{OperRouterGrpcClient, convert, v1};
use operrouter_sdk::{
    CallContext, ChatMessage, DataSourceConfig, DataSourceQueryResponse, DataSourceResponse,
    LlmConfig, LlmEmbeddingResponse, LlmGenerateResponse, LlmResponse, LoadConfigResponse,
    MetadataResponse, OperRouterClient, OperRouterError, PingResponse, Row, ValidateConfigResponse,
};
use parking_lot::RwLock;
use tonic::transport::Channel;

use crate::transport::{GrpcClientConfig, connect_with_stack};

type Stub = OperRouterGrpcClient<Channel>;

/// gRPC adapter.
///
/// Holds one HTTP/2 channel; tonic multiplexes concurrent calls over it.
/// After [`OperRouterClient::close`] every call fails with
/// [`OperRouterError::Closed`].
pub struct GrpcClient {
    stub: RwLock<Option<Stub>>,
    cfg: GrpcClientConfig,
}

impl GrpcClient {
    /// Connect with the default configuration. `address` may be `host:port`
    /// or a full URI.
    ///
    /// # Errors
    ///
    /// See [`connect_with_stack`].
    pub async fn connect(address: &str) -> Result<Self, OperRouterError> {
        Self::connect_with_config(address, GrpcClientConfig::default()).await
    }

    /// Connect with an explicit configuration.
    ///
    /// # Errors
    ///
    /// See [`connect_with_stack`].
    pub async fn connect_with_config(
        address: &str,
        cfg: GrpcClientConfig,
    ) -> Result<Self, OperRouterError> {
        let channel: Channel = connect_with_stack(address, &cfg).await?;
        let stub = Stub::new(channel);
        Ok(Self {
            stub: RwLock::new(Some(stub)),
            cfg,
        })
    }

    /// Wrap a caller-built channel, e.g. one configured for TLS.
    #[must_use]
    pub fn from_channel(channel: Channel, cfg: GrpcClientConfig) -> Self {
        Self {
            stub: RwLock::new(Some(OperRouterGrpcClient::new(channel))),
            cfg,
        }
    }

    fn stub(&self) -> Result<Stub, OperRouterError> {
        self.stub.read().clone().ok_or(OperRouterError::Closed)
    }

    async fn call<Req, Resp, F, Fut>(
        &self,
        ctx: &CallContext,
        method: &'static str,
        message: Req,
        rpc: F,
    ) -> Result<Resp, OperRouterError>
    where
        F: FnOnce(Stub, tonic::Request<Req>) -> Fut,
        Fut: Future<Output = Result<tonic::Response<Resp>, tonic::Status>>,
    {
        let budget = ctx.budget(self.cfg.rpc_timeout)?;
        let stub = self.stub()?;

        let mut request = tonic::Request::new(message);
        request.set_timeout(budget);

        tracing::debug!(
            service = self.cfg.service_name,
            method,
            timeout_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            "gRPC call"
        );

        let started = Instant::now();
        match tokio::time::timeout(budget, rpc(stub, request)).await {
            Ok(Ok(response)) => Ok(response.into_inner()),
            // The server cancels with the same deadline; that race still counts as a timeout.
            Ok(Err(status))
                if status.code() == tonic::Code::Cancelled && started.elapsed() >= budget =>
            {
                Err(OperRouterError::Timeout(budget))
            }
            Ok(Err(status)) => Err(map_status(status, budget)),
            Err(_) => Err(OperRouterError::Timeout(budget)),
        }
    }
}

/// Classify a gRPC status into the SDK taxonomy.
pub(crate) fn map_status(status: tonic::Status, budget: Duration) -> OperRouterError {
    match status.code() {
        tonic::Code::DeadlineExceeded => OperRouterError::Timeout(budget),
        tonic::Code::Unavailable | tonic::Code::Cancelled => OperRouterError::transport(status),
        tonic::Code::Unknown if std::error::Error::source(&status).is_some() => {
            OperRouterError::transport(status)
        }
        code => OperRouterError::Rpc {
            code: i64::from(code as i32),
            message: status.message().to_owned(),
        },
    }
}

#[async_trait]
impl OperRouterClient for GrpcClient {
    async fn ping(&self, ctx: &CallContext) -> Result<PingResponse, OperRouterError> {
        let reply = self
            .call(ctx, "Ping", v1::PingRequest {}, |mut c, r| async move { c.ping(r).await })
            .await?;
        Ok(reply.into())
    }

    async fn validate_config(
        &self,
        ctx: &CallContext,
        toml: &str,
    ) -> Result<ValidateConfigResponse, OperRouterError> {
        let req = convert::validate_config_request(toml);
        let reply = self
            .call(ctx, "ValidateConfig", req, |mut c, r| async move { c.validate_config(r).await })
            .await?;
        Ok(reply.into())
    }

    async fn load_config(
        &self,
        ctx: &CallContext,
        path: &str,
    ) -> Result<LoadConfigResponse, OperRouterError> {
        let req = convert::load_config_request(path);
        let reply = self
            .call(ctx, "LoadConfig", req, |mut c, r| async move { c.load_config(r).await })
            .await?;
        Ok(reply.into())
    }

    async fn get_metadata(&self, ctx: &CallContext) -> Result<MetadataResponse, OperRouterError> {
        let reply = self
            .call(ctx, "GetMetadata", v1::GetMetadataRequest {}, |mut c, r| async move {
                c.get_metadata(r).await
            })
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
        let reply = self
            .call(ctx, "CreateDataSource", req, |mut c, r| async move {
                c.create_data_source(r).await
            })
            .await?;
        Ok(reply.into())
    }

    async fn query_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        query: &str,
    ) -> Result<DataSourceQueryResponse, OperRouterError> {
        let req = convert::query_datasource_request(name, query);
        let reply = self
            .call(ctx, "QueryDataSource", req, |mut c, r| async move {
                c.query_data_source(r).await
            })
            .await?;
        Ok(reply.into())
    }

    async fn execute_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        statement: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let req = convert::execute_datasource_request(name, statement);
        let reply = self
            .call(ctx, "ExecuteDataSource", req, |mut c, r| async move {
                c.execute_data_source(r).await
            })
            .await?;
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
        let reply = self
            .call(ctx, "InsertDataSource", req, |mut c, r| async move {
                c.insert_data_source(r).await
            })
            .await?;
        Ok(reply.into())
    }

    async fn ping_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let req = convert::ping_datasource_request(name);
        let reply = self
            .call(ctx, "PingDataSource", req, |mut c, r| async move { c.ping_data_source(r).await })
            .await?;
        Ok(reply.into())
    }

    async fn close_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let req = convert::close_datasource_request(name);
        let reply = self
            .call(ctx, "CloseDataSource", req, |mut c, r| async move {
                c.close_data_source(r).await
            })
            .await?;
        Ok(reply.into())
    }

    async fn create_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        config: &LlmConfig,
    ) -> Result<LlmResponse, OperRouterError> {
        if !config.options.is_empty() {
            tracing::debug!(name, "LLM options are not carried over gRPC");
        }
        let req = convert::create_llm_request(name, config);
        let reply = self
            .call(ctx, "CreateLLM", req, |mut c, r| async move { c.create_llm(r).await })
            .await?;
        Ok(reply.into())
    }

    async fn generate_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        prompt: &str,
    ) -> Result<LlmGenerateResponse, OperRouterError> {
        let req = convert::generate_llm_request(name, prompt);
        let reply = self
            .call(ctx, "GenerateLLM", req, |mut c, r| async move { c.generate_llm(r).await })
            .await?;
        Ok(reply.into())
    }

    async fn chat_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        messages: &[ChatMessage],
    ) -> Result<LlmGenerateResponse, OperRouterError> {
        let req = convert::chat_llm_request(name, messages);
        let reply = self
            .call(ctx, "ChatLLM", req, |mut c, r| async move { c.chat_llm(r).await })
            .await?;
        Ok(reply.into())
    }

    async fn embedding_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        text: &str,
    ) -> Result<LlmEmbeddingResponse, OperRouterError> {
        let req = convert::embedding_llm_request(name, text);
        let reply = self
            .call(ctx, "EmbeddingLLM", req, |mut c, r| async move { c.embedding_llm(r).await })
            .await?;
        Ok(reply.into())
    }

    async fn ping_llm(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<LlmResponse, OperRouterError> {
        let req = convert::ping_llm_request(name);
        let reply = self
            .call(ctx, "PingLLM", req, |mut c, r| async move { c.ping_llm(r).await })
            .await?;
        Ok(reply.into())
    }

    async fn close_llm(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<LlmResponse, OperRouterError> {
        let req = convert::close_llm_request(name);
        let reply = self
            .call(ctx, "CloseLLM", req, |mut c, r| async move { c.close_llm(r).await })
            .await?;
        Ok(reply.into())
    }

    async fn close(&self) -> Result<(), OperRouterError> {
        if self.stub.write().take().is_some() {
            tracing::info!(service = self.cfg.service_name, "gRPC client closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_exceeded_is_timeout() {
        let err = map_status(tonic::Status::deadline_exceeded("slow"), Duration::from_secs(5));
        assert!(matches!(err, OperRouterError::Timeout(d) if d == Duration::from_secs(5)));
    }

    #[test]
    fn unavailable_is_transport() {
        let err =
            map_status(tonic::Status::unavailable("connection refused"), Duration::from_secs(1));
        assert!(err.is_transport(), "{err}");
    }

    #[test]
    fn application_status_keeps_code_and_message() {
        let err = map_status(tonic::Status::invalid_argument("bad name"), Duration::from_secs(1));
        match err {
            OperRouterError::Rpc { code, message } => {
                assert_eq!(code, 3);
                assert_eq!(message, "bad name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
