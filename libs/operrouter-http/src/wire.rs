//! JSON-RPC 2.0 envelopes and result payloads.
//!
//! Result payloads default every field so a reply that omits one decodes
//! to the zero value instead of failing.

use operrouter_sdk::{
    DataSourceQueryResponse, DataSourceResponse, LlmEmbeddingResponse, LlmGenerateResponse,
    LlmResponse, LoadConfigResponse, MetadataResponse, PingResponse, Row, ValidateConfigResponse,
};
use serde::{Deserialize, Deserializer, Serialize};

/// Every request carries this id; calls are never pipelined.
pub(crate) const REQUEST_ID: u64 = 1;

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
    pub id: u64,
}

impl<'a> RpcRequest<'a> {
    pub(crate) fn new(method: &'a str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
            id: REQUEST_ID,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse {
    /// `None` when the member is absent, `Some(None)` when it is `null`.
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Option<serde_json::Value>>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<serde_json::Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<serde_json::Value>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorObject {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct PingResult {
    status: String,
    version: String,
}

impl From<PingResult> for PingResponse {
    fn from(r: PingResult) -> Self {
        Self {
            status: r.status,
            version: r.version,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ValidateConfigResult {
    valid: bool,
    errors: Option<Vec<String>>,
}

impl From<ValidateConfigResult> for ValidateConfigResponse {
    fn from(r: ValidateConfigResult) -> Self {
        Self {
            valid: r.valid,
            errors: r.errors.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoadConfigResult {
    success: bool,
    message: String,
    operator_name: String,
}

impl From<LoadConfigResult> for LoadConfigResponse {
    fn from(r: LoadConfigResult) -> Self {
        Self {
            success: r.success,
            operator_name: r.operator_name,
            error: r.message,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct MetadataResult {
    name: String,
    version: String,
    description: String,
}

impl From<MetadataResult> for MetadataResponse {
    fn from(r: MetadataResult) -> Self {
        Self {
            name: r.name,
            version: r.version,
            description: r.description,
        }
    }
}

/// `{success, message}` envelope shared by most datasource and LLM methods.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StatusResult {
    success: bool,
    message: String,
}

impl From<StatusResult> for DataSourceResponse {
    fn from(r: StatusResult) -> Self {
        Self {
            success: r.success,
            message: r.message,
        }
    }
}

impl From<StatusResult> for LlmResponse {
    fn from(r: StatusResult) -> Self {
        Self {
            success: r.success,
            message: r.message,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct QueryResult {
    success: bool,
    rows: Option<Vec<Row>>,
    message: String,
}

impl From<QueryResult> for DataSourceQueryResponse {
    fn from(r: QueryResult) -> Self {
        Self {
            success: r.success,
            rows: r.rows.unwrap_or_default(),
            message: r.message,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TextResult {
    success: bool,
    text: String,
    message: String,
}

impl From<TextResult> for LlmGenerateResponse {
    fn from(r: TextResult) -> Self {
        Self {
            success: r.success,
            text: r.text,
            message: r.message,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct EmbeddingResult {
    success: bool,
    embedding: Option<Vec<f64>>,
    message: String,
}

impl From<EmbeddingResult> for LlmEmbeddingResponse {
    fn from(r: EmbeddingResult) -> Self {
        Self {
            success: r.success,
            embedding: r.embedding.unwrap_or_default(),
            message: r.message,
        }
    }
}
