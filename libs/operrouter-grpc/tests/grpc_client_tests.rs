//! Integration tests for the gRPC adapter against an in-process server.

use std::net::SocketAddr;
use std::time::Duration;

use operrouter_grpc::{GrpcClient, GrpcClientConfig};
use operrouter_proto::memory::MemoryRouter;
use operrouter_proto::v1;
use operrouter_proto::{OperRouter, OperRouterServer};
use operrouter_sdk::{
    CallContext, ChatMessage, DataSourceConfig, KafkaConnection, LlmConfig, OperRouterClient,
    OperRouterError, Row, SqlConnection, Value,
};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Request, Response, Status};

async fn serve<S: OperRouter>(service: S) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(OperRouterServer::new(service))
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    addr
}

async fn memory_client() -> GrpcClient {
    let addr = serve(MemoryRouter::new()).await;
    GrpcClient::connect(&addr.to_string()).await.unwrap()
}

#[tokio::test]
async fn ping_and_metadata() {
    let client = memory_client().await;
    let ctx = CallContext::background();

    let pong = client.ping(&ctx).await.unwrap();
    assert_eq!(pong.status, "ok");
    assert_eq!(pong.version, operrouter_proto::memory::VERSION);

    let meta = client.get_metadata(&ctx).await.unwrap();
    assert_eq!(meta.name, "memory-router");
}

#[tokio::test]
async fn datasource_round_trip_keeps_typed_values() {
    let client = memory_client().await;
    let ctx = CallContext::with_timeout(Duration::from_secs(5));
    let cfg = DataSourceConfig::Postgres(
        SqlConnection::new("localhost", 5432, "testdb").with_credentials("postgres", "password"),
    );

    let created = client.create_datasource(&ctx, "main", &cfg).await.unwrap();
    assert!(created.success, "{}", created.message);

    let mut row = Row::new();
    row.insert("id".to_owned(), Value::Int(42));
    row.insert("name".to_owned(), Value::from("alice"));
    row.insert("score".to_owned(), Value::Float(0.75));
    row.insert("deleted".to_owned(), Value::Null);
    let inserted = client.insert_datasource(&ctx, "main", "users", &row).await.unwrap();
    assert!(inserted.success, "{}", inserted.message);

    let result = client.query_datasource(&ctx, "main", "SELECT * FROM users").await.unwrap();
    assert!(result.success);
    assert_eq!(result.rows, vec![row]);

    assert!(client.ping_datasource(&ctx, "main").await.unwrap().success);
    assert!(client.execute_datasource(&ctx, "main", "DELETE FROM users").await.unwrap().success);
    assert!(client.query_datasource(&ctx, "main", "SELECT 1").await.unwrap().rows.is_empty());
    assert!(client.close_datasource(&ctx, "main").await.unwrap().success);
}

#[tokio::test]
async fn application_failures_are_not_errors() {
    let client = memory_client().await;
    let ctx = CallContext::background();

    let pong = client.ping_datasource(&ctx, "missing").await.unwrap();
    assert!(!pong.success);
    assert_eq!(pong.message, "datasource 'missing' not found");

    let kafka = DataSourceConfig::Kafka(KafkaConnection::new("b1:9092,b2:9092"));
    assert!(client.create_datasource(&ctx, "events", &kafka).await.unwrap().success);
    let dup = client.create_datasource(&ctx, "events", &kafka).await.unwrap();
    assert!(!dup.success);
}

#[tokio::test]
async fn chat_preserves_order_and_roles() {
    let client = memory_client().await;
    let ctx = CallContext::background();

    let created = client
        .create_llm(&ctx, "bot", &LlmConfig::new("openai", "gpt-4o-mini").with_api_key("sk-test"))
        .await
        .unwrap();
    assert!(created.success, "{}", created.message);

    let reply = client
        .chat_llm(
            &ctx,
            "bot",
            &[ChatMessage::system("You are helpful"), ChatMessage::user("Hi")],
        )
        .await
        .unwrap();
    assert_eq!(reply.text, "system: You are helpful\nuser: Hi");

    let generated = client.generate_llm(&ctx, "bot", "hello").await.unwrap();
    assert_eq!(generated.text, "gpt-4o-mini: hello");

    let embedding = client.embedding_llm(&ctx, "bot", "two words").await.unwrap();
    assert_eq!(embedding.embedding, vec![9.0, 2.0, 1.0]);

    assert!(client.ping_llm(&ctx, "bot").await.unwrap().success);
    assert!(client.close_llm(&ctx, "bot").await.unwrap().success);
    assert!(!client.ping_llm(&ctx, "bot").await.unwrap().success);
}

#[tokio::test]
async fn close_is_idempotent_and_blocks_further_calls() {
    let client = memory_client().await;

    client.close().await.unwrap();
    client.close().await.unwrap();

    let err = client.ping(&CallContext::background()).await.unwrap_err();
    assert!(matches!(err, OperRouterError::Closed), "{err}");
}

#[tokio::test]
async fn expired_context_fails_before_the_call() {
    let client = memory_client().await;
    let ctx = CallContext::with_timeout(Duration::ZERO);

    let err = client.ping(&ctx).await.unwrap_err();
    assert!(matches!(err, OperRouterError::Timeout(_)), "{err}");
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let cfg = GrpcClientConfig::default().with_connect_timeout(Duration::from_millis(500));
    let err = GrpcClient::connect_with_config(&addr.to_string(), cfg)
        .await
        .err()
        .unwrap();
    assert!(err.is_transport(), "{err}");
}

/// Router that answers slowly or rejects, to exercise error mapping.
struct Misbehaving;

#[tonic::async_trait]
impl OperRouter for Misbehaving {
    async fn ping(
        &self,
        _: Request<v1::PingRequest>,
    ) -> Result<Response<v1::PingResponse>, Status> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(Response::new(v1::PingResponse::default()))
    }

    async fn validate_config(
        &self,
        _: Request<v1::ValidateConfigRequest>,
    ) -> Result<Response<v1::ValidateConfigResponse>, Status> {
        Err(Status::invalid_argument("toml_content must not be empty"))
    }

    async fn load_config(
        &self,
        _: Request<v1::LoadConfigRequest>,
    ) -> Result<Response<v1::LoadConfigResponse>, Status> {
        Err(Status::unimplemented("load_config"))
    }

    async fn get_metadata(
        &self,
        _: Request<v1::GetMetadataRequest>,
    ) -> Result<Response<v1::GetMetadataResponse>, Status> {
        Ok(Response::new(v1::GetMetadataResponse { metadata: None }))
    }

    async fn create_data_source(
        &self,
        _: Request<v1::CreateDataSourceRequest>,
    ) -> Result<Response<v1::CreateDataSourceResponse>, Status> {
        Err(Status::unimplemented("create_data_source"))
    }

    async fn query_data_source(
        &self,
        _: Request<v1::QueryDataSourceRequest>,
    ) -> Result<Response<v1::QueryDataSourceResponse>, Status> {
        Err(Status::unimplemented("query_data_source"))
    }

    async fn execute_data_source(
        &self,
        _: Request<v1::ExecuteDataSourceRequest>,
    ) -> Result<Response<v1::ExecuteDataSourceResponse>, Status> {
        Err(Status::unimplemented("execute_data_source"))
    }

    async fn insert_data_source(
        &self,
        _: Request<v1::InsertDataSourceRequest>,
    ) -> Result<Response<v1::InsertDataSourceResponse>, Status> {
        Err(Status::unimplemented("insert_data_source"))
    }

    async fn ping_data_source(
        &self,
        _: Request<v1::PingDataSourceRequest>,
    ) -> Result<Response<v1::PingDataSourceResponse>, Status> {
        Err(Status::unimplemented("ping_data_source"))
    }

    async fn close_data_source(
        &self,
        _: Request<v1::CloseDataSourceRequest>,
    ) -> Result<Response<v1::CloseDataSourceResponse>, Status> {
        Err(Status::unimplemented("close_data_source"))
    }

    async fn create_llm(
        &self,
        _: Request<v1::CreateLlmRequest>,
    ) -> Result<Response<v1::CreateLlmResponse>, Status> {
        Err(Status::unimplemented("create_llm"))
    }

    async fn generate_llm(
        &self,
        _: Request<v1::GenerateLlmRequest>,
    ) -> Result<Response<v1::GenerateLlmResponse>, Status> {
        Err(Status::unimplemented("generate_llm"))
    }

    async fn chat_llm(
        &self,
        _: Request<v1::ChatLlmRequest>,
    ) -> Result<Response<v1::ChatLlmResponse>, Status> {
        Err(Status::unimplemented("chat_llm"))
    }

    async fn embedding_llm(
        &self,
        _: Request<v1::EmbeddingLlmRequest>,
    ) -> Result<Response<v1::EmbeddingLlmResponse>, Status> {
        Err(Status::unimplemented("embedding_llm"))
    }

    async fn ping_llm(
        &self,
        _: Request<v1::PingLlmRequest>,
    ) -> Result<Response<v1::PingLlmResponse>, Status> {
        Err(Status::unimplemented("ping_llm"))
    }

    async fn close_llm(
        &self,
        _: Request<v1::CloseLlmRequest>,
    ) -> Result<Response<v1::CloseLlmResponse>, Status> {
        Err(Status::unimplemented("close_llm"))
    }
}

#[tokio::test]
async fn slow_reply_hits_the_call_deadline() {
    let addr = serve(Misbehaving).await;
    let client = GrpcClient::connect(&addr.to_string()).await.unwrap();

    let err = client
        .ping(&CallContext::with_timeout(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, OperRouterError::Timeout(_)), "{err}");
}

#[tokio::test]
async fn status_errors_keep_code_and_message() {
    let addr = serve(Misbehaving).await;
    let client = GrpcClient::connect(&addr.to_string()).await.unwrap();

    let err = client
        .validate_config(&CallContext::background(), "")
        .await
        .unwrap_err();
    match err {
        OperRouterError::Rpc { code, message } => {
            assert_eq!(code, i64::from(tonic::Code::InvalidArgument as i32));
            assert_eq!(message, "toml_content must not be empty");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn absent_metadata_is_missing_field() {
    let addr = serve(Misbehaving).await;
    let client = GrpcClient::connect(&addr.to_string()).await.unwrap();

    let err = client.get_metadata(&CallContext::background()).await.unwrap_err();
    assert!(matches!(err, OperRouterError::MissingField("metadata")), "{err}");
}
