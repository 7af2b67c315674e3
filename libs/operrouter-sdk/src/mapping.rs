//! Shared mapping from loose configuration to wire descriptors.
//!
//! The gRPC and FFI adapters send the same protobuf messages, so both go
//! through these functions. Every function here is total: unknown inputs
//! map to the `Unspecified` tag instead of failing.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::config::{DataSourceConfig, LlmConfig, Params};
use crate::models::{DataSourceDescriptor, DataSourceKind, LlmDescriptor, LlmProvider, MessageRole};

/// Map a driver name to its wire tag.
#[must_use]
pub fn datasource_kind(driver: &str) -> DataSourceKind {
    match driver {
        "postgres" | "postgresql" => DataSourceKind::PostgreSql,
        "mysql" => DataSourceKind::MySql,
        "redis" => DataSourceKind::Redis,
        "mongodb" | "mongo" => DataSourceKind::MongoDb,
        "kafka" => DataSourceKind::Kafka,
        _ => DataSourceKind::Unspecified,
    }
}

/// Map a provider name to its wire tag.
#[must_use]
pub fn llm_provider(provider: &str) -> LlmProvider {
    match provider {
        "openai" => LlmProvider::OpenAi,
        "ollama" => LlmProvider::Ollama,
        "anthropic" | "claude" => LlmProvider::Anthropic,
        "local" => LlmProvider::Local,
        _ => LlmProvider::Unspecified,
    }
}

/// Map a chat role name to its wire tag.
#[must_use]
pub fn message_role(role: &str) -> MessageRole {
    match role {
        "system" => MessageRole::System,
        "user" => MessageRole::User,
        "assistant" => MessageRole::Assistant,
        _ => MessageRole::Unspecified,
    }
}

/// Render a loose value as text: strings verbatim, anything else as JSON.
#[must_use]
pub fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build the wire descriptor for a datasource.
///
/// SQL drivers get a `scheme://host:port/database` URL, redis and mongodb a
/// `scheme://host:port` URL, kafka its broker list verbatim, and unknown
/// drivers an empty URL. Credentials and unconsumed keys travel as extras.
#[must_use]
pub fn describe_datasource(name: &str, config: &DataSourceConfig) -> DataSourceDescriptor {
    let mut extra = BTreeMap::new();

    let url = match config {
        DataSourceConfig::Postgres(c) => {
            add_credentials(&mut extra, c.username.as_ref(), c.password.as_ref());
            add_extras(&mut extra, &c.extra);
            format!("postgres://{}:{}/{}", c.host, c.port, c.database)
        }
        DataSourceConfig::MySql(c) => {
            add_credentials(&mut extra, c.username.as_ref(), c.password.as_ref());
            add_extras(&mut extra, &c.extra);
            format!("mysql://{}:{}/{}", c.host, c.port, c.database)
        }
        DataSourceConfig::Redis(c) => {
            add_credentials(&mut extra, c.username.as_ref(), c.password.as_ref());
            add_extras(&mut extra, &c.extra);
            format!("redis://{}:{}", c.host, c.port)
        }
        DataSourceConfig::MongoDb(c) => {
            add_credentials(&mut extra, c.username.as_ref(), c.password.as_ref());
            add_extras(&mut extra, &c.extra);
            format!("mongodb://{}:{}", c.host, c.port)
        }
        DataSourceConfig::Kafka(c) => {
            add_credentials(&mut extra, c.username.as_ref(), c.password.as_ref());
            add_extras(&mut extra, &c.extra);
            c.brokers.clone()
        }
        DataSourceConfig::Other { driver, params } => {
            extra.insert("driver".to_owned(), driver.clone());
            add_extras(&mut extra, params);
            String::new()
        }
    };

    DataSourceDescriptor {
        name: name.to_owned(),
        kind: config.kind(),
        url,
        extra,
    }
}

/// Build the wire descriptor for an LLM client. Options are not carried.
#[must_use]
pub fn describe_llm(name: &str, config: &LlmConfig) -> LlmDescriptor {
    LlmDescriptor {
        name: name.to_owned(),
        provider: config.provider,
        model: config.model.clone(),
        api_key: config.api_key.clone(),
    }
}

fn add_credentials(
    extra: &mut BTreeMap<String, String>,
    username: Option<&String>,
    password: Option<&String>,
) {
    if let Some(u) = username {
        extra.insert("username".to_owned(), u.clone());
    }
    if let Some(p) = password {
        extra.insert("password".to_owned(), p.clone());
    }
}

fn add_extras(extra: &mut BTreeMap<String, String>, params: &Params) {
    for (k, v) in params {
        extra.entry(k.clone()).or_insert_with(|| stringify(v));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HostConnection, KafkaConnection, SqlConnection};
    use serde_json::json;

    #[test]
    fn driver_aliases() {
        assert_eq!(datasource_kind("postgres"), DataSourceKind::PostgreSql);
        assert_eq!(datasource_kind("postgresql"), DataSourceKind::PostgreSql);
        assert_eq!(datasource_kind("mongo"), DataSourceKind::MongoDb);
        assert_eq!(datasource_kind("Postgres"), DataSourceKind::Unspecified);
        assert_eq!(datasource_kind(""), DataSourceKind::Unspecified);
    }

    #[test]
    fn provider_and_role_aliases() {
        assert_eq!(llm_provider("claude"), LlmProvider::Anthropic);
        assert_eq!(llm_provider("anthropic"), LlmProvider::Anthropic);
        assert_eq!(llm_provider("gemini"), LlmProvider::Unspecified);
        assert_eq!(message_role("assistant"), MessageRole::Assistant);
        assert_eq!(message_role("tool"), MessageRole::Unspecified);
    }

    #[test]
    fn postgres_descriptor_carries_credentials_as_extras() {
        let cfg = DataSourceConfig::Postgres(
            SqlConnection::new("localhost", 5432, "testdb")
                .with_credentials("postgres", "password"),
        );
        let d = describe_datasource("main", &cfg);

        assert_eq!(d.name, "main");
        assert_eq!(d.kind, DataSourceKind::PostgreSql);
        assert_eq!(d.url, "postgres://localhost:5432/testdb");
        assert_eq!(d.extra.get("username").map(String::as_str), Some("postgres"));
        assert_eq!(d.extra.get("password").map(String::as_str), Some("password"));
        assert_eq!(d.extra.len(), 2);
    }

    #[test]
    fn mysql_and_host_only_urls() {
        let mysql = DataSourceConfig::MySql(SqlConnection::new("db", 3306, "shop"));
        assert_eq!(describe_datasource("m", &mysql).url, "mysql://db:3306/shop");

        let redis = DataSourceConfig::Redis(HostConnection::new("cache", 6379).with_extra("db", 2));
        let d = describe_datasource("r", &redis);
        assert_eq!(d.url, "redis://cache:6379");
        assert_eq!(d.extra.get("db").map(String::as_str), Some("2"));

        let mongo = DataSourceConfig::MongoDb(HostConnection::new("docs", 27017));
        assert_eq!(describe_datasource("d", &mongo).url, "mongodb://docs:27017");
    }

    #[test]
    fn kafka_brokers_become_url_verbatim() {
        let cfg = DataSourceConfig::Kafka(KafkaConnection::new("b1:9092,b2:9092"));
        let d = describe_datasource("events", &cfg);
        assert_eq!(d.kind, DataSourceKind::Kafka);
        assert_eq!(d.url, "b1:9092,b2:9092");
        assert!(d.extra.is_empty());
    }

    #[test]
    fn unknown_driver_maps_to_unspecified_with_empty_url() {
        let mut params = Params::new();
        params.insert("hosts".to_owned(), json!("c1,c2"));
        params.insert("replicas".to_owned(), json!(3));
        params.insert("tls".to_owned(), json!(null));
        let cfg = DataSourceConfig::Other {
            driver: "cassandra".to_owned(),
            params,
        };

        let d = describe_datasource("wide", &cfg);
        assert_eq!(d.kind, DataSourceKind::Unspecified);
        assert_eq!(d.url, "");
        assert_eq!(d.extra.get("driver").map(String::as_str), Some("cassandra"));
        assert_eq!(d.extra.get("hosts").map(String::as_str), Some("c1,c2"));
        assert_eq!(d.extra.get("replicas").map(String::as_str), Some("3"));
        assert_eq!(d.extra.get("tls").map(String::as_str), Some("null"));
    }

    #[test]
    fn llm_descriptor_drops_options() {
        let cfg = LlmConfig::new("openai", "gpt-4o-mini")
            .with_api_key("sk-test")
            .with_option("temperature", 0.2);
        let d = describe_llm("chat", &cfg);
        assert_eq!(
            d,
            LlmDescriptor {
                name: "chat".to_owned(),
                provider: LlmProvider::OpenAi,
                model: "gpt-4o-mini".to_owned(),
                api_key: Some("sk-test".to_owned()),
            }
        );
    }

    #[test]
    fn stringify_keeps_strings_verbatim() {
        assert_eq!(stringify(&json!("plain")), "plain");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&json!([1, 2])), "[1,2]");
    }
}
