//! JSON-RPC implementation of [`OperRouterClient`].

use std::time::Duration;

use async_trait::async_trait;
use operrouter_sdk::{
    CallContext, ChatMessage, DataSourceConfig, DataSourceQueryResponse, DataSourceResponse,
    LlmConfig, LlmEmbeddingResponse, LlmGenerateResponse, LlmResponse, LoadConfigResponse,
    MetadataResponse, OperRouterClient, OperRouterError, PingResponse, Row, ValidateConfigResponse,
};
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};

use crate::config::HttpClientConfig;
use crate::wire::{
    EmbeddingResult, LoadConfigResult, MetadataResult, PingResult, QueryResult, RpcRequest,
    RpcResponse, StatusResult, TextResult, ValidateConfigResult,
};

/// Longest body excerpt quoted in protocol errors.
const BODY_PREVIEW_LEN: usize = 256;

/// JSON-RPC 2.0 over HTTP adapter.
///
/// Stateless apart from the pooled `reqwest` client, so it can be shared
/// freely between tasks. [`OperRouterClient::close`] does nothing.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    endpoint: String,
    cfg: HttpClientConfig,
}

impl HttpClient {
    /// Create a client for `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`OperRouterError::Transport`] if the HTTP stack cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, OperRouterError> {
        Self::with_config(HttpClientConfig::new(base_url))
    }

    /// Create a client from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OperRouterError::Transport`] if the HTTP stack cannot be built.
    pub fn with_config(cfg: HttpClientConfig) -> Result<Self, OperRouterError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .connect_timeout(cfg.connect_timeout)
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(OperRouterError::transport)?;

        Ok(Self {
            endpoint: cfg.endpoint(),
            http,
            cfg,
        })
    }

    #[must_use]
    pub fn config(&self) -> &HttpClientConfig {
        &self.cfg
    }

    /// Post one JSON-RPC request and return its `result` member.
    async fn call_raw(
        &self,
        ctx: &CallContext,
        method: &str,
        params: Option<JsonValue>,
    ) -> Result<Option<JsonValue>, OperRouterError> {
        let budget = ctx.budget(self.cfg.request_timeout)?;
        tracing::debug!(
            method,
            endpoint = %self.endpoint,
            timeout_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            "JSON-RPC call"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .timeout(budget)
            .json(&RpcRequest::new(method, params))
            .send()
            .await
            .map_err(|e| classify(e, budget))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| classify(e, budget))?;

        let reply: RpcResponse = serde_json::from_slice(&body).map_err(|e| {
            if status.is_success() {
                OperRouterError::Protocol(format!("malformed JSON-RPC reply: {e}"))
            } else {
                OperRouterError::Protocol(format!("HTTP {status}: {}", preview(&body)))
            }
        })?;

        if let Some(err) = reply.error {
            tracing::debug!(method, code = err.code, message = %err.message, "JSON-RPC error");
            return Err(OperRouterError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        if !status.is_success() {
            return Err(OperRouterError::Protocol(format!("HTTP {status}: {}", preview(&body))));
        }

        match reply.result {
            Some(result) => Ok(result),
            None => Err(OperRouterError::Protocol(format!(
                "JSON-RPC reply to {method} has neither result nor error: {}",
                preview(&body)
            ))),
        }
    }

    /// Call and decode the result, defaulting a missing result to zero values.
    async fn call<R>(
        &self,
        ctx: &CallContext,
        method: &str,
        params: Option<JsonValue>,
    ) -> Result<R, OperRouterError>
    where
        R: DeserializeOwned + Default,
    {
        match self.call_raw(ctx, method, params).await? {
            Some(result) => decode(method, result),
            None => Ok(R::default()),
        }
    }
}

fn decode<R: DeserializeOwned>(method: &str, result: JsonValue) -> Result<R, OperRouterError> {
    serde_json::from_value(result)
        .map_err(|e| OperRouterError::Protocol(format!("failed to decode {method} result: {e}")))
}

fn classify(err: reqwest::Error, budget: Duration) -> OperRouterError {
    if err.is_timeout() {
        OperRouterError::Timeout(budget)
    } else if err.is_decode() {
        OperRouterError::Protocol(err.to_string())
    } else {
        OperRouterError::transport(err)
    }
}

fn preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(BODY_PREVIEW_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}

#[async_trait]
impl OperRouterClient for HttpClient {
    async fn ping(&self, ctx: &CallContext) -> Result<PingResponse, OperRouterError> {
        let r: PingResult = self.call(ctx, "ping", None).await?;
        Ok(r.into())
    }

    async fn validate_config(
        &self,
        ctx: &CallContext,
        toml: &str,
    ) -> Result<ValidateConfigResponse, OperRouterError> {
        let r: ValidateConfigResult = self
            .call(ctx, "validate_config", Some(json!({ "config_toml": toml })))
            .await?;
        Ok(r.into())
    }

    async fn load_config(
        &self,
        ctx: &CallContext,
        path: &str,
    ) -> Result<LoadConfigResponse, OperRouterError> {
        let r: LoadConfigResult = self
            .call(ctx, "load_config", Some(json!({ "config_path": path })))
            .await?;
        Ok(r.into())
    }

    async fn get_metadata(&self, ctx: &CallContext) -> Result<MetadataResponse, OperRouterError> {
        let result = self
            .call_raw(ctx, "get_metadata", None)
            .await?
            .ok_or(OperRouterError::MissingField("metadata"))?;
        let r: MetadataResult = decode("get_metadata", result)?;
        Ok(r.into())
    }

    async fn create_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        config: &DataSourceConfig,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let params = json!({ "name": name, "config": config.to_params() });
        let r: StatusResult = self.call(ctx, "datasource.create", Some(params)).await?;
        Ok(r.into())
    }

    async fn query_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        query: &str,
    ) -> Result<DataSourceQueryResponse, OperRouterError> {
        let params = json!({ "name": name, "query": query });
        let r: QueryResult = self.call(ctx, "datasource.query", Some(params)).await?;
        Ok(r.into())
    }

    async fn execute_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        statement: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let params = json!({ "name": name, "query": statement });
        let r: StatusResult = self.call(ctx, "datasource.execute", Some(params)).await?;
        Ok(r.into())
    }

    async fn insert_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
        table: &str,
        data: &Row,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let mut params = json!({ "name": name, "data": data });
        if !table.is_empty() {
            params["table"] = JsonValue::from(table);
        }
        let r: StatusResult = self.call(ctx, "datasource.insert", Some(params)).await?;
        Ok(r.into())
    }

    async fn ping_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let r: StatusResult = self
            .call(ctx, "datasource.ping", Some(json!({ "name": name })))
            .await?;
        Ok(r.into())
    }

    async fn close_datasource(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<DataSourceResponse, OperRouterError> {
        let r: StatusResult = self
            .call(ctx, "datasource.close", Some(json!({ "name": name })))
            .await?;
        Ok(r.into())
    }

    async fn create_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        config: &LlmConfig,
    ) -> Result<LlmResponse, OperRouterError> {
        let params = json!({ "name": name, "config": config.to_params() });
        let r: StatusResult = self.call(ctx, "llm.create", Some(params)).await?;
        Ok(r.into())
    }

    async fn generate_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        prompt: &str,
    ) -> Result<LlmGenerateResponse, OperRouterError> {
        let params = json!({ "name": name, "prompt": prompt });
        let r: TextResult = self.call(ctx, "llm.generate", Some(params)).await?;
        Ok(r.into())
    }

    async fn chat_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        messages: &[ChatMessage],
    ) -> Result<LlmGenerateResponse, OperRouterError> {
        let params = json!({ "name": name, "messages": messages });
        let r: TextResult = self.call(ctx, "llm.chat", Some(params)).await?;
        Ok(r.into())
    }

    async fn embedding_llm(
        &self,
        ctx: &CallContext,
        name: &str,
        text: &str,
    ) -> Result<LlmEmbeddingResponse, OperRouterError> {
        let params = json!({ "name": name, "text": text });
        let r: EmbeddingResult = self.call(ctx, "llm.embedding", Some(params)).await?;
        Ok(r.into())
    }

    async fn ping_llm(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<LlmResponse, OperRouterError> {
        let r: StatusResult = self.call(ctx, "llm.ping", Some(json!({ "name": name }))).await?;
        Ok(r.into())
    }

    async fn close_llm(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<LlmResponse, OperRouterError> {
        let r: StatusResult = self.call(ctx, "llm.close", Some(json!({ "name": name }))).await?;
        Ok(r.into())
    }

    async fn close(&self) -> Result<(), OperRouterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(BODY_PREVIEW_LEN + 10);
        let p = preview(body.as_bytes());
        assert_eq!(p.len(), BODY_PREVIEW_LEN + 3);
        assert!(p.ends_with("..."));

        assert_eq!(preview(b"Bad Gateway"), "Bad Gateway");
    }
}
