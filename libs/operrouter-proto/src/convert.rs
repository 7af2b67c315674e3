//! Conversions between SDK models and `operrouter.v1` messages.
//!
//! Request builders go through [`operrouter_sdk::mapping`] so gRPC and FFI
//! send byte-identical messages for the same call. Response conversions map
//! `error` to `message` and `healthy` to `success`.

use std::collections::HashMap;

use operrouter_sdk::{self as sdk, OperRouterError, mapping};

use crate::v1;

// ---- enums ----

impl From<sdk::DataSourceKind> for v1::DataSourceType {
    fn from(kind: sdk::DataSourceKind) -> Self {
        match kind {
            sdk::DataSourceKind::Unspecified => Self::Unspecified,
            sdk::DataSourceKind::PostgreSql => Self::Postgresql,
            sdk::DataSourceKind::MySql => Self::Mysql,
            sdk::DataSourceKind::Redis => Self::Redis,
            sdk::DataSourceKind::MongoDb => Self::Mongodb,
            sdk::DataSourceKind::Kafka => Self::Kafka,
        }
    }
}

impl From<v1::DataSourceType> for sdk::DataSourceKind {
    fn from(kind: v1::DataSourceType) -> Self {
        match kind {
            v1::DataSourceType::Unspecified => Self::Unspecified,
            v1::DataSourceType::Postgresql => Self::PostgreSql,
            v1::DataSourceType::Mysql => Self::MySql,
            v1::DataSourceType::Redis => Self::Redis,
            v1::DataSourceType::Mongodb => Self::MongoDb,
            v1::DataSourceType::Kafka => Self::Kafka,
        }
    }
}

impl From<sdk::LlmProvider> for v1::LlmProvider {
    fn from(provider: sdk::LlmProvider) -> Self {
        match provider {
            sdk::LlmProvider::Unspecified => Self::Unspecified,
            sdk::LlmProvider::OpenAi => Self::Openai,
            sdk::LlmProvider::Ollama => Self::Ollama,
            sdk::LlmProvider::Anthropic => Self::Anthropic,
            sdk::LlmProvider::Local => Self::Local,
        }
    }
}

impl From<v1::LlmProvider> for sdk::LlmProvider {
    fn from(provider: v1::LlmProvider) -> Self {
        match provider {
            v1::LlmProvider::Unspecified => Self::Unspecified,
            v1::LlmProvider::Openai => Self::OpenAi,
            v1::LlmProvider::Ollama => Self::Ollama,
            v1::LlmProvider::Anthropic => Self::Anthropic,
            v1::LlmProvider::Local => Self::Local,
        }
    }
}

impl From<sdk::MessageRole> for v1::MessageRole {
    fn from(role: sdk::MessageRole) -> Self {
        match role {
            sdk::MessageRole::Unspecified => Self::Unspecified,
            sdk::MessageRole::System => Self::System,
            sdk::MessageRole::User => Self::User,
            sdk::MessageRole::Assistant => Self::Assistant,
        }
    }
}

impl From<v1::MessageRole> for sdk::MessageRole {
    fn from(role: v1::MessageRole) -> Self {
        match role {
            v1::MessageRole::Unspecified => Self::Unspecified,
            v1::MessageRole::System => Self::System,
            v1::MessageRole::User => Self::User,
            v1::MessageRole::Assistant => Self::Assistant,
        }
    }
}

// ---- values and rows ----

impl From<&sdk::Value> for v1::Value {
    fn from(value: &sdk::Value) -> Self {
        use v1::value::Value as Kind;

        let kind = match value {
            sdk::Value::Null => Kind::NullValue(true),
            sdk::Value::Bool(b) => Kind::BoolValue(*b),
            sdk::Value::Int(i) => Kind::IntValue(*i),
            sdk::Value::Float(f) => Kind::DoubleValue(*f),
            sdk::Value::String(s) => Kind::StringValue(s.clone()),
            sdk::Value::Bytes(b) => Kind::BytesValue(b.clone()),
            sdk::Value::Json(v) => Kind::StringValue(v.to_string()),
        };
        Self { value: Some(kind) }
    }
}

impl From<v1::Value> for sdk::Value {
    fn from(value: v1::Value) -> Self {
        use v1::value::Value as Kind;

        match value.value {
            None | Some(Kind::NullValue(_)) => Self::Null,
            Some(Kind::BoolValue(b)) => Self::Bool(b),
            Some(Kind::IntValue(i)) => Self::Int(i),
            Some(Kind::DoubleValue(f)) => Self::Float(f),
            Some(Kind::StringValue(s)) => Self::String(s),
            Some(Kind::BytesValue(b)) => Self::Bytes(b),
        }
    }
}

impl From<&sdk::Row> for v1::Row {
    fn from(row: &sdk::Row) -> Self {
        Self {
            columns: row.iter().map(|(k, v)| (k.clone(), v.into())).collect(),
        }
    }
}

impl From<v1::Row> for sdk::Row {
    fn from(row: v1::Row) -> Self {
        row.columns.into_iter().map(|(k, v)| (k, v.into())).collect()
    }
}

// ---- descriptors ----

impl From<&sdk::DataSourceDescriptor> for v1::DataSourceConfig {
    fn from(desc: &sdk::DataSourceDescriptor) -> Self {
        Self {
            r#type: v1::DataSourceType::from(desc.kind).into(),
            url: desc.url.clone(),
            extra: desc
                .extra
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }
}

impl From<&sdk::LlmDescriptor> for v1::LlmConfig {
    fn from(desc: &sdk::LlmDescriptor) -> Self {
        Self {
            provider: v1::LlmProvider::from(desc.provider).into(),
            model: desc.model.clone(),
            api_key: desc.api_key.clone(),
        }
    }
}

impl From<&sdk::ChatMessage> for v1::LlmMessage {
    fn from(msg: &sdk::ChatMessage) -> Self {
        Self {
            role: v1::MessageRole::from(msg.role).into(),
            content: msg.content.clone(),
        }
    }
}

impl From<v1::LlmMessage> for sdk::ChatMessage {
    fn from(msg: v1::LlmMessage) -> Self {
        Self::new(msg.role().into(), msg.content)
    }
}

// ---- requests ----

#[must_use]
pub fn validate_config_request(toml: &str) -> v1::ValidateConfigRequest {
    v1::ValidateConfigRequest {
        toml_content: toml.to_owned(),
    }
}

#[must_use]
pub fn load_config_request(path: &str) -> v1::LoadConfigRequest {
    v1::LoadConfigRequest {
        config_path: path.to_owned(),
    }
}

#[must_use]
pub fn create_datasource_request(
    name: &str,
    config: &sdk::DataSourceConfig,
) -> v1::CreateDataSourceRequest {
    let desc = mapping::describe_datasource(name, config);
    v1::CreateDataSourceRequest {
        name: desc.name.clone(),
        config: Some((&desc).into()),
    }
}

#[must_use]
pub fn query_datasource_request(name: &str, query: &str) -> v1::QueryDataSourceRequest {
    v1::QueryDataSourceRequest {
        name: name.to_owned(),
        query: query.to_owned(),
    }
}

#[must_use]
pub fn execute_datasource_request(name: &str, statement: &str) -> v1::ExecuteDataSourceRequest {
    v1::ExecuteDataSourceRequest {
        name: name.to_owned(),
        query: statement.to_owned(),
    }
}

#[must_use]
pub fn insert_datasource_request(
    name: &str,
    table: &str,
    data: &sdk::Row,
) -> v1::InsertDataSourceRequest {
    v1::InsertDataSourceRequest {
        name: name.to_owned(),
        table: table.to_owned(),
        data: Some(data.into()),
    }
}

#[must_use]
pub fn ping_datasource_request(name: &str) -> v1::PingDataSourceRequest {
    v1::PingDataSourceRequest { name: name.to_owned() }
}

#[must_use]
pub fn close_datasource_request(name: &str) -> v1::CloseDataSourceRequest {
    v1::CloseDataSourceRequest { name: name.to_owned() }
}

#[must_use]
pub fn create_llm_request(name: &str, config: &sdk::LlmConfig) -> v1::CreateLlmRequest {
    let desc = mapping::describe_llm(name, config);
    v1::CreateLlmRequest {
        name: desc.name.clone(),
        config: Some((&desc).into()),
    }
}

#[must_use]
pub fn generate_llm_request(name: &str, prompt: &str) -> v1::GenerateLlmRequest {
    v1::GenerateLlmRequest {
        name: name.to_owned(),
        prompt: prompt.to_owned(),
    }
}

#[must_use]
pub fn chat_llm_request(name: &str, messages: &[sdk::ChatMessage]) -> v1::ChatLlmRequest {
    v1::ChatLlmRequest {
        name: name.to_owned(),
        messages: messages.iter().map(Into::into).collect(),
    }
}

#[must_use]
pub fn embedding_llm_request(name: &str, text: &str) -> v1::EmbeddingLlmRequest {
    v1::EmbeddingLlmRequest {
        name: name.to_owned(),
        text: text.to_owned(),
    }
}

#[must_use]
pub fn ping_llm_request(name: &str) -> v1::PingLlmRequest {
    v1::PingLlmRequest { name: name.to_owned() }
}

#[must_use]
pub fn close_llm_request(name: &str) -> v1::CloseLlmRequest {
    v1::CloseLlmRequest { name: name.to_owned() }
}

// ---- responses ----

impl From<v1::PingResponse> for sdk::PingResponse {
    fn from(r: v1::PingResponse) -> Self {
        Self {
            status: r.status,
            version: r.version,
        }
    }
}

impl From<v1::ValidateConfigResponse> for sdk::ValidateConfigResponse {
    fn from(r: v1::ValidateConfigResponse) -> Self {
        Self {
            valid: r.valid,
            errors: r.errors,
        }
    }
}

impl From<v1::LoadConfigResponse> for sdk::LoadConfigResponse {
    fn from(r: v1::LoadConfigResponse) -> Self {
        Self {
            success: r.success,
            operator_name: r.operator_name,
            error: r.error,
        }
    }
}

impl TryFrom<v1::GetMetadataResponse> for sdk::MetadataResponse {
    type Error = OperRouterError;

    fn try_from(r: v1::GetMetadataResponse) -> Result<Self, Self::Error> {
        let meta = r.metadata.ok_or(OperRouterError::MissingField("metadata"))?;
        Ok(Self {
            name: meta.name,
            version: meta.version,
            description: meta.description,
        })
    }
}

/// Implements `From<$proto>` for an SDK envelope whose status flag is
/// `$flag` on the wire and whose message is the wire `error` field.
macro_rules! status_envelope {
    ($proto:ty => $sdk:ty, $flag:ident) => {
        impl From<$proto> for $sdk {
            fn from(r: $proto) -> Self {
                Self {
                    success: r.$flag,
                    message: r.error,
                }
            }
        }
    };
}

status_envelope!(v1::CreateDataSourceResponse => sdk::DataSourceResponse, success);
status_envelope!(v1::ExecuteDataSourceResponse => sdk::DataSourceResponse, success);
status_envelope!(v1::InsertDataSourceResponse => sdk::DataSourceResponse, success);
status_envelope!(v1::PingDataSourceResponse => sdk::DataSourceResponse, healthy);
status_envelope!(v1::CloseDataSourceResponse => sdk::DataSourceResponse, success);
status_envelope!(v1::CreateLlmResponse => sdk::LlmResponse, success);
status_envelope!(v1::PingLlmResponse => sdk::LlmResponse, healthy);
status_envelope!(v1::CloseLlmResponse => sdk::LlmResponse, success);

impl From<v1::QueryDataSourceResponse> for sdk::DataSourceQueryResponse {
    fn from(r: v1::QueryDataSourceResponse) -> Self {
        Self {
            success: r.success,
            rows: r.rows.into_iter().map(Into::into).collect(),
            message: r.error,
        }
    }
}

impl From<v1::GenerateLlmResponse> for sdk::LlmGenerateResponse {
    fn from(r: v1::GenerateLlmResponse) -> Self {
        Self {
            success: r.success,
            text: r.text,
            message: r.error,
        }
    }
}

impl From<v1::ChatLlmResponse> for sdk::LlmGenerateResponse {
    fn from(r: v1::ChatLlmResponse) -> Self {
        Self {
            success: r.success,
            text: r.text,
            message: r.error,
        }
    }
}

impl From<v1::EmbeddingLlmResponse> for sdk::LlmEmbeddingResponse {
    fn from(r: v1::EmbeddingLlmResponse) -> Self {
        Self {
            success: r.success,
            embedding: r.embedding.into_iter().map(f64::from).collect(),
            message: r.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_datasource_request_uses_shared_mapping() {
        let cfg = sdk::DataSourceConfig::Postgres(
            sdk::SqlConnection::new("localhost", 5432, "testdb")
                .with_credentials("postgres", "password"),
        );
        let req = create_datasource_request("main", &cfg);

        assert_eq!(req.name, "main");
        let config = req.config.unwrap();
        assert_eq!(config.r#type(), v1::DataSourceType::Postgresql);
        assert_eq!(config.url, "postgres://localhost:5432/testdb");
        assert_eq!(config.extra.get("username").map(String::as_str), Some("postgres"));
        assert_eq!(config.extra.get("password").map(String::as_str), Some("password"));
    }

    #[test]
    fn unknown_driver_is_sent_unspecified() {
        let cfg = sdk::DataSourceConfig::Other {
            driver: "cassandra".to_owned(),
            params: sdk::Params::new(),
        };
        let config = create_datasource_request("wide", &cfg).config.unwrap();
        assert_eq!(config.r#type(), v1::DataSourceType::Unspecified);
        assert!(config.url.is_empty());
    }

    #[test]
    fn chat_request_preserves_order_and_roles() {
        let messages = [
            sdk::ChatMessage::system("You are helpful"),
            sdk::ChatMessage::user("Hi"),
        ];
        let req = chat_llm_request("bot", &messages);

        let roles: Vec<_> = req.messages.iter().map(v1::LlmMessage::role).collect();
        assert_eq!(roles, [v1::MessageRole::System, v1::MessageRole::User]);

        let back: Vec<sdk::ChatMessage> = req.messages.into_iter().map(Into::into).collect();
        assert_eq!(back, messages);
    }

    #[test]
    fn llm_request_carries_optional_api_key() {
        let req = create_llm_request("bot", &sdk::LlmConfig::new("claude", "claude-3-haiku"));
        let config = req.config.unwrap();
        assert_eq!(config.provider(), v1::LlmProvider::Anthropic);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn rows_keep_typed_values() {
        let mut row = sdk::Row::new();
        row.insert("id".to_owned(), sdk::Value::Int(1));
        row.insert("score".to_owned(), sdk::Value::Float(0.5));
        row.insert("blob".to_owned(), sdk::Value::Bytes(vec![0, 1]));
        row.insert("gone".to_owned(), sdk::Value::Null);

        let wire = v1::Row::from(&row);
        assert_eq!(
            wire.columns["id"].value,
            Some(v1::value::Value::IntValue(1))
        );
        assert_eq!(sdk::Row::from(wire), row);
    }

    #[test]
    fn non_finite_floats_survive_the_wire() {
        let wire = v1::Value::from(&sdk::Value::Float(f64::NAN));
        match sdk::Value::from(wire) {
            sdk::Value::Float(f) => assert!(f.is_nan()),
            other => panic!("expected a float, got {other:?}"),
        }

        let wire = v1::Value::from(&sdk::Value::Float(f64::NEG_INFINITY));
        assert_eq!(sdk::Value::from(wire), sdk::Value::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn json_values_travel_as_text() {
        let value = sdk::Value::Json(serde_json::json!({"k": [1, 2]}));
        let wire = v1::Value::from(&value);
        assert_eq!(
            wire.value,
            Some(v1::value::Value::StringValue(r#"{"k":[1,2]}"#.to_owned()))
        );
    }

    #[test]
    fn ping_envelopes_map_healthy_to_success() {
        let r: sdk::DataSourceResponse = v1::PingDataSourceResponse {
            healthy: false,
            error: "connection refused".to_owned(),
        }
        .into();
        assert!(!r.success);
        assert_eq!(r.message, "connection refused");

        let r: sdk::LlmResponse = v1::PingLlmResponse {
            healthy: true,
            error: String::new(),
        }
        .into();
        assert!(r.success);
    }

    #[test]
    fn missing_metadata_is_an_error() {
        let reply = v1::GetMetadataResponse { metadata: None };
        let err = sdk::MetadataResponse::try_from(reply).unwrap_err();
        assert!(matches!(err, OperRouterError::MissingField("metadata")));
    }

    #[test]
    fn embedding_widens_to_f64() {
        let r: sdk::LlmEmbeddingResponse = v1::EmbeddingLlmResponse {
            success: true,
            embedding: vec![0.25, -1.0],
            error: String::new(),
        }
        .into();
        assert_eq!(r.embedding, vec![0.25_f64, -1.0]);
    }
}
