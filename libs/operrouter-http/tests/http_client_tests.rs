//! JSON-RPC adapter tests against a mock HTTP server.

use std::time::Duration;

use httpmock::prelude::*;
use operrouter_http::{HttpClient, HttpClientConfig};
use operrouter_sdk::{
    CallContext, ChatMessage, DataSourceConfig, LlmConfig, OperRouterClient, OperRouterError, Row,
    SqlConnection, Value,
};
use serde_json::json;

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::new(server.base_url()).unwrap()
}

#[tokio::test]
async fn ping_posts_jsonrpc_without_params() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/jsonrpc")
            .header("content-type", "application/json")
            .json_body(json!({"jsonrpc": "2.0", "method": "ping", "id": 1}));
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "result": {"status": "ok", "version": "0.3.0"},
            "id": 1
        }));
    });

    let pong = client_for(&server).ping(&CallContext::background()).await.unwrap();

    mock.assert();
    assert_eq!(pong.status, "ok");
    assert_eq!(pong.version, "0.3.0");
}

#[tokio::test]
async fn trailing_slash_on_base_url_is_tolerated() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/jsonrpc");
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "result": {"status": "ok"}, "id": 1}));
    });

    let client = HttpClient::new(format!("{}/", server.base_url())).unwrap();
    let pong = client.ping(&CallContext::background()).await.unwrap();

    mock.assert();
    assert_eq!(pong.status, "ok");
    assert_eq!(pong.version, "");
}

#[tokio::test]
async fn error_object_becomes_rpc_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/jsonrpc");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32601, "message": "Method not found"},
            "result": {"valid": true},
            "id": 1
        }));
    });

    let err = client_for(&server)
        .validate_config(&CallContext::background(), "name = \"op\"")
        .await
        .unwrap_err();

    match err {
        OperRouterError::Rpc { code, message } => {
            assert_eq!(code, -32601);
            assert_eq!(message, "Method not found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn load_config_maps_message_to_error() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/jsonrpc").json_body(json!({
            "jsonrpc": "2.0",
            "method": "load_config",
            "params": {"config_path": "/etc/operator.toml"},
            "id": 1
        }));
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "result": {"success": false, "message": "file not found"},
            "id": 1
        }));
    });

    let r = client_for(&server)
        .load_config(&CallContext::background(), "/etc/operator.toml")
        .await
        .unwrap();

    mock.assert();
    assert!(!r.success);
    assert_eq!(r.error, "file not found");
}

#[tokio::test]
async fn null_metadata_is_missing_field() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/jsonrpc");
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "result": null, "id": 1}));
    });

    let err = client_for(&server)
        .get_metadata(&CallContext::background())
        .await
        .unwrap_err();
    assert!(matches!(err, OperRouterError::MissingField("metadata")), "{err}");
}

#[tokio::test]
async fn create_datasource_sends_loose_config() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/jsonrpc").json_body(json!({
            "jsonrpc": "2.0",
            "method": "datasource.create",
            "params": {
                "name": "main",
                "config": {
                    "driver": "postgres",
                    "host": "localhost",
                    "port": 5432,
                    "database": "testdb",
                    "username": "postgres",
                    "password": "password"
                }
            },
            "id": 1
        }));
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "result": {"success": true, "message": "created"},
            "id": 1
        }));
    });

    let cfg = DataSourceConfig::Postgres(
        SqlConnection::new("localhost", 5432, "testdb").with_credentials("postgres", "password"),
    );
    let r = client_for(&server)
        .create_datasource(&CallContext::background(), "main", &cfg)
        .await
        .unwrap();

    mock.assert();
    assert!(r.success);
    assert_eq!(r.message, "created");
}

#[tokio::test]
async fn query_rows_decode_into_typed_values() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/jsonrpc");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "result": {
                "success": true,
                "rows": [{"id": 1, "name": "alice", "score": 0.5, "deleted": null}]
            },
            "id": 1
        }));
    });

    let r = client_for(&server)
        .query_datasource(&CallContext::background(), "main", "SELECT * FROM users")
        .await
        .unwrap();

    assert!(r.success);
    assert_eq!(r.rows.len(), 1);
    let row = &r.rows[0];
    assert_eq!(row["id"], Value::Int(1));
    assert_eq!(row["name"], Value::from("alice"));
    assert_eq!(row["score"], Value::Float(0.5));
    assert_eq!(row["deleted"], Value::Null);
}

#[tokio::test]
async fn insert_carries_table_and_typed_row() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/jsonrpc").json_body(json!({
            "jsonrpc": "2.0",
            "method": "datasource.insert",
            "params": {"name": "main", "table": "users", "data": {"id": 7, "name": "bob"}},
            "id": 1
        }));
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "result": {"success": true}, "id": 1}));
    });

    let mut row = Row::new();
    row.insert("id".to_owned(), Value::Int(7));
    row.insert("name".to_owned(), Value::from("bob"));

    let r = client_for(&server)
        .insert_datasource(&CallContext::background(), "main", "users", &row)
        .await
        .unwrap();

    mock.assert();
    assert!(r.success);
}

#[tokio::test]
async fn chat_preserves_order_and_roles() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/jsonrpc").json_body(json!({
            "jsonrpc": "2.0",
            "method": "llm.chat",
            "params": {
                "name": "bot",
                "messages": [
                    {"role": "system", "content": "You are helpful"},
                    {"role": "user", "content": "Hi"}
                ]
            },
            "id": 1
        }));
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "result": {"success": true, "text": "Hello!"},
            "id": 1
        }));
    });

    let r = client_for(&server)
        .chat_llm(
            &CallContext::background(),
            "bot",
            &[ChatMessage::system("You are helpful"), ChatMessage::user("Hi")],
        )
        .await
        .unwrap();

    mock.assert();
    assert_eq!(r.text, "Hello!");
}

#[tokio::test]
async fn llm_options_travel_in_config() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST).path("/jsonrpc").json_body(json!({
            "jsonrpc": "2.0",
            "method": "llm.create",
            "params": {
                "name": "bot",
                "config": {"provider": "ollama", "model": "llama3", "temperature": 0.2}
            },
            "id": 1
        }));
        then.status(200)
            .json_body(json!({"jsonrpc": "2.0", "result": {"success": true}, "id": 1}));
    });

    let cfg = LlmConfig::new("ollama", "llama3").with_option("temperature", 0.2);
    let r = client_for(&server)
        .create_llm(&CallContext::background(), "bot", &cfg)
        .await
        .unwrap();

    mock.assert();
    assert!(r.success);
}

#[tokio::test]
async fn embedding_keeps_f64_precision() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/jsonrpc");
        then.status(200).json_body(json!({
            "jsonrpc": "2.0",
            "result": {"success": true, "embedding": [0.1, 0.2, 0.3]},
            "id": 1
        }));
    });

    let r = client_for(&server)
        .embedding_llm(&CallContext::background(), "bot", "hello")
        .await
        .unwrap();
    assert_eq!(r.embedding, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn non_json_reply_is_a_protocol_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/jsonrpc");
        then.status(502).body("Bad Gateway");
    });

    let err = client_for(&server)
        .ping(&CallContext::background())
        .await
        .unwrap_err();
    assert!(err.is_protocol(), "{err}");
    assert!(err.to_string().contains("Bad Gateway"), "{err}");
}

#[tokio::test]
async fn server_error_without_envelope_is_a_protocol_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/jsonrpc");
        then.status(500).json_body(json!({"message": "internal server error"}));
    });

    let err = client_for(&server)
        .ping_datasource(&CallContext::background(), "main")
        .await
        .unwrap_err();
    assert!(err.is_protocol(), "{err}");
    assert!(err.to_string().contains("500"), "{err}");
    assert!(err.to_string().contains("internal server error"), "{err}");
}

#[tokio::test]
async fn error_object_wins_over_http_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/jsonrpc");
        then.status(500).json_body(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32603, "message": "Internal error"},
            "id": 1
        }));
    });

    let err = client_for(&server).ping(&CallContext::background()).await.unwrap_err();
    assert!(matches!(err, OperRouterError::Rpc { code: -32603, .. }), "{err}");
}

#[tokio::test]
async fn reply_without_result_or_error_is_a_protocol_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/jsonrpc");
        then.status(200).json_body(json!({"jsonrpc": "2.0", "id": 1}));
    });

    let err = client_for(&server)
        .close_llm(&CallContext::background(), "bot")
        .await
        .unwrap_err();
    assert!(err.is_protocol(), "{err}");
    assert!(err.to_string().contains("neither result nor error"), "{err}");
}

#[tokio::test]
async fn slow_reply_hits_the_call_deadline() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/jsonrpc");
        then.status(200)
            .delay(Duration::from_millis(500))
            .json_body(json!({"jsonrpc": "2.0", "result": {}, "id": 1}));
    });

    let err = client_for(&server)
        .ping(&CallContext::with_timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, OperRouterError::Timeout(_)), "{err}");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let cfg = HttpClientConfig::new("http://127.0.0.1:9")
        .with_connect_timeout(Duration::from_millis(500));
    let client = HttpClient::with_config(cfg).unwrap();

    let err = client.ping(&CallContext::background()).await.unwrap_err();
    assert!(err.is_transport(), "{err}");
}

#[tokio::test]
async fn close_is_a_no_op() {
    let server = MockServer::start();
    let client = client_for(&server);
    client.close().await.unwrap();
    client.close().await.unwrap();
}
