//! In-memory operator router.
//!
//! Serves the `operrouter.v1` contract from process memory: datasources
//! keep the rows inserted into them and LLMs answer deterministically. It
//! backs the in-process gRPC server and the statically linked FFI core used
//! in tests and local runs.

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::Mutex;
use tonic::{Request, Response, Status};

use crate::v1::{
    self, ChatLlmRequest, ChatLlmResponse, CloseDataSourceRequest, CloseDataSourceResponse,
    CloseLlmRequest, CloseLlmResponse, CreateDataSourceRequest, CreateDataSourceResponse,
    CreateLlmRequest, CreateLlmResponse, EmbeddingLlmRequest, EmbeddingLlmResponse,
    ExecuteDataSourceRequest, ExecuteDataSourceResponse, GenerateLlmRequest, GenerateLlmResponse,
    GetMetadataRequest, GetMetadataResponse, InsertDataSourceRequest, InsertDataSourceResponse,
    LoadConfigRequest, LoadConfigResponse, OperatorMetadata, PingDataSourceRequest,
    PingDataSourceResponse, PingLlmRequest, PingLlmResponse, PingRequest, PingResponse,
    QueryDataSourceRequest, QueryDataSourceResponse, ValidateConfigRequest, ValidateConfigResponse,
};
use crate::{OperRouter, OperRouterServer};

/// Version reported by `Ping` and `GetMetadata`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

struct Table {
    config: v1::DataSourceConfig,
    rows: Vec<v1::Row>,
}

#[derive(Default)]
struct State {
    datasources: BTreeMap<String, Table>,
    llms: BTreeMap<String, v1::LlmConfig>,
}

/// Operator router holding all state in memory.
#[derive(Default)]
pub struct MemoryRouter {
    state: Mutex<State>,
}

impl MemoryRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the router into a tonic service.
    #[must_use]
    pub fn into_service(self) -> OperRouterServer<Self> {
        OperRouterServer::new(self)
    }

    #[must_use]
    pub fn ping(&self, _req: PingRequest) -> PingResponse {
        PingResponse {
            status: "ok".to_owned(),
            version: VERSION.to_owned(),
        }
    }

    #[must_use]
    pub fn validate_config(&self, req: ValidateConfigRequest) -> ValidateConfigResponse {
        let mut errors = Vec::new();
        if req.toml_content.trim().is_empty() {
            errors.push("configuration is empty".to_owned());
        } else if !req.toml_content.lines().any(|l| l.trim_start().starts_with("name")) {
            errors.push("missing required key 'name'".to_owned());
        }

        ValidateConfigResponse {
            valid: errors.is_empty(),
            errors,
        }
    }

    #[must_use]
    pub fn load_config(&self, req: LoadConfigRequest) -> LoadConfigResponse {
        match Path::new(&req.config_path).file_stem().and_then(|s| s.to_str()) {
            Some(stem) => LoadConfigResponse {
                success: true,
                operator_name: stem.to_owned(),
                error: String::new(),
            },
            None => LoadConfigResponse {
                success: false,
                operator_name: String::new(),
                error: format!("invalid config path '{}'", req.config_path),
            },
        }
    }

    #[must_use]
    pub fn get_metadata(&self, _req: GetMetadataRequest) -> GetMetadataResponse {
        GetMetadataResponse {
            metadata: Some(OperatorMetadata {
                name: "memory-router".to_owned(),
                version: VERSION.to_owned(),
                description: "In-memory operator router".to_owned(),
            }),
        }
    }

    #[must_use]
    pub fn create_datasource(&self, req: CreateDataSourceRequest) -> CreateDataSourceResponse {
        let Some(config) = req.config else {
            return CreateDataSourceResponse {
                success: false,
                error: "config is required".to_owned(),
            };
        };
        if config.r#type() == v1::DataSourceType::Unspecified {
            let driver = config.extra.get("driver").map_or("unknown", String::as_str);
            return CreateDataSourceResponse {
                success: false,
                error: format!("unsupported datasource driver '{driver}'"),
            };
        }

        let mut state = self.state.lock();
        if state.datasources.contains_key(&req.name) {
            return CreateDataSourceResponse {
                success: false,
                error: format!("datasource '{}' already exists", req.name),
            };
        }
        state.datasources.insert(req.name, Table { config, rows: Vec::new() });

        CreateDataSourceResponse {
            success: true,
            error: String::new(),
        }
    }

    #[must_use]
    pub fn query_datasource(&self, req: QueryDataSourceRequest) -> QueryDataSourceResponse {
        let state = self.state.lock();
        match state.datasources.get(&req.name) {
            Some(table) => QueryDataSourceResponse {
                success: true,
                rows: table.rows.clone(),
                error: String::new(),
            },
            None => QueryDataSourceResponse {
                success: false,
                rows: Vec::new(),
                error: not_found("datasource", &req.name),
            },
        }
    }

    /// `DELETE` statements clear the datasource; anything else affects no rows.
    #[must_use]
    pub fn execute_datasource(&self, req: ExecuteDataSourceRequest) -> ExecuteDataSourceResponse {
        let mut state = self.state.lock();
        let Some(table) = state.datasources.get_mut(&req.name) else {
            return ExecuteDataSourceResponse {
                success: false,
                rows_affected: 0,
                error: not_found("datasource", &req.name),
            };
        };

        let is_delete = req
            .query
            .trim_start()
            .get(..6)
            .is_some_and(|verb| verb.eq_ignore_ascii_case("delete"));
        let rows_affected = if is_delete {
            let removed = table.rows.len();
            table.rows.clear();
            i64::try_from(removed).unwrap_or(i64::MAX)
        } else {
            0
        };

        ExecuteDataSourceResponse {
            success: true,
            rows_affected,
            error: String::new(),
        }
    }

    #[must_use]
    pub fn insert_datasource(&self, req: InsertDataSourceRequest) -> InsertDataSourceResponse {
        let mut state = self.state.lock();
        let Some(table) = state.datasources.get_mut(&req.name) else {
            return InsertDataSourceResponse {
                success: false,
                error: not_found("datasource", &req.name),
            };
        };
        match req.data {
            Some(row) if !row.columns.is_empty() => {
                table.rows.push(row);
                InsertDataSourceResponse {
                    success: true,
                    error: String::new(),
                }
            }
            _ => InsertDataSourceResponse {
                success: false,
                error: "insert requires at least one column".to_owned(),
            },
        }
    }

    /// Healthy when the datasource exists and has a connection URL.
    #[must_use]
    pub fn ping_datasource(&self, req: PingDataSourceRequest) -> PingDataSourceResponse {
        let state = self.state.lock();
        let error = match state.datasources.get(&req.name) {
            None => not_found("datasource", &req.name),
            Some(table) if table.config.url.is_empty() => {
                "datasource has no connection URL".to_owned()
            }
            Some(_) => String::new(),
        };
        PingDataSourceResponse {
            healthy: error.is_empty(),
            error,
        }
    }

    #[must_use]
    pub fn close_datasource(&self, req: CloseDataSourceRequest) -> CloseDataSourceResponse {
        let removed = self.state.lock().datasources.remove(&req.name).is_some();
        CloseDataSourceResponse {
            success: removed,
            error: if removed {
                String::new()
            } else {
                not_found("datasource", &req.name)
            },
        }
    }

    #[must_use]
    pub fn create_llm(&self, req: CreateLlmRequest) -> CreateLlmResponse {
        let Some(config) = req.config else {
            return CreateLlmResponse {
                success: false,
                error: "config is required".to_owned(),
            };
        };
        if config.provider() == v1::LlmProvider::Unspecified {
            return CreateLlmResponse {
                success: false,
                error: "unsupported LLM provider".to_owned(),
            };
        }

        let mut state = self.state.lock();
        if state.llms.contains_key(&req.name) {
            return CreateLlmResponse {
                success: false,
                error: format!("LLM '{}' already exists", req.name),
            };
        }
        state.llms.insert(req.name, config);

        CreateLlmResponse {
            success: true,
            error: String::new(),
        }
    }

    /// Answers with `<model>: <prompt>`.
    #[must_use]
    pub fn generate_llm(&self, req: GenerateLlmRequest) -> GenerateLlmResponse {
        match self.model_of(&req.name) {
            Some(model) => GenerateLlmResponse {
                success: true,
                text: format!("{model}: {}", req.prompt),
                error: String::new(),
            },
            None => GenerateLlmResponse {
                success: false,
                text: String::new(),
                error: not_found("LLM", &req.name),
            },
        }
    }

    /// Answers with the transcript, one `role: content` line per message.
    #[must_use]
    pub fn chat_llm(&self, req: ChatLlmRequest) -> ChatLlmResponse {
        if self.model_of(&req.name).is_none() {
            return ChatLlmResponse {
                success: false,
                text: String::new(),
                error: not_found("LLM", &req.name),
            };
        }

        let text = req
            .messages
            .iter()
            .map(|m| format!("{}: {}", role_name(m.role()), m.content))
            .collect::<Vec<_>>()
            .join("\n");

        ChatLlmResponse {
            success: true,
            text,
            error: String::new(),
        }
    }

    /// Embeds text as `[chars, words, lines]`.
    #[must_use]
    pub fn embedding_llm(&self, req: EmbeddingLlmRequest) -> EmbeddingLlmResponse {
        if self.model_of(&req.name).is_none() {
            return EmbeddingLlmResponse {
                success: false,
                embedding: Vec::new(),
                error: not_found("LLM", &req.name),
            };
        }

        let embedding = [
            req.text.chars().count(),
            req.text.split_whitespace().count(),
            req.text.lines().count(),
        ]
        .into_iter()
        .map(|n| f32::from(u16::try_from(n).unwrap_or(u16::MAX)))
        .collect();

        EmbeddingLlmResponse {
            success: true,
            embedding,
            error: String::new(),
        }
    }

    #[must_use]
    pub fn ping_llm(&self, req: PingLlmRequest) -> PingLlmResponse {
        let healthy = self.model_of(&req.name).is_some();
        PingLlmResponse {
            healthy,
            error: if healthy {
                String::new()
            } else {
                not_found("LLM", &req.name)
            },
        }
    }

    #[must_use]
    pub fn close_llm(&self, req: CloseLlmRequest) -> CloseLlmResponse {
        let removed = self.state.lock().llms.remove(&req.name).is_some();
        CloseLlmResponse {
            success: removed,
            error: if removed {
                String::new()
            } else {
                not_found("LLM", &req.name)
            },
        }
    }

    fn model_of(&self, name: &str) -> Option<String> {
        self.state.lock().llms.get(name).map(|c| c.model.clone())
    }
}

fn not_found(what: &str, name: &str) -> String {
    format!("{what} '{name}' not found")
}

fn role_name(role: v1::MessageRole) -> &'static str {
    match role {
        v1::MessageRole::System => "system",
        v1::MessageRole::User => "user",
        v1::MessageRole::Assistant => "assistant",
        v1::MessageRole::Unspecified => "unspecified",
    }
}

#[tonic::async_trait]
impl OperRouter for MemoryRouter {
    async fn ping(&self, request: Request<PingRequest>) -> Result<Response<PingResponse>, Status> {
        Ok(Response::new(Self::ping(self, request.into_inner())))
    }

    async fn validate_config(
        &self,
        request: Request<ValidateConfigRequest>,
    ) -> Result<Response<ValidateConfigResponse>, Status> {
        Ok(Response::new(Self::validate_config(self, request.into_inner())))
    }

    async fn load_config(
        &self,
        request: Request<LoadConfigRequest>,
    ) -> Result<Response<LoadConfigResponse>, Status> {
        Ok(Response::new(Self::load_config(self, request.into_inner())))
    }

    async fn get_metadata(
        &self,
        request: Request<GetMetadataRequest>,
    ) -> Result<Response<GetMetadataResponse>, Status> {
        Ok(Response::new(Self::get_metadata(self, request.into_inner())))
    }

    async fn create_data_source(
        &self,
        request: Request<CreateDataSourceRequest>,
    ) -> Result<Response<CreateDataSourceResponse>, Status> {
        Ok(Response::new(Self::create_datasource(self, request.into_inner())))
    }

    async fn query_data_source(
        &self,
        request: Request<QueryDataSourceRequest>,
    ) -> Result<Response<QueryDataSourceResponse>, Status> {
        Ok(Response::new(Self::query_datasource(self, request.into_inner())))
    }

    async fn execute_data_source(
        &self,
        request: Request<ExecuteDataSourceRequest>,
    ) -> Result<Response<ExecuteDataSourceResponse>, Status> {
        Ok(Response::new(Self::execute_datasource(self, request.into_inner())))
    }

    async fn insert_data_source(
        &self,
        request: Request<InsertDataSourceRequest>,
    ) -> Result<Response<InsertDataSourceResponse>, Status> {
        Ok(Response::new(Self::insert_datasource(self, request.into_inner())))
    }

    async fn ping_data_source(
        &self,
        request: Request<PingDataSourceRequest>,
    ) -> Result<Response<PingDataSourceResponse>, Status> {
        Ok(Response::new(Self::ping_datasource(self, request.into_inner())))
    }

    async fn close_data_source(
        &self,
        request: Request<CloseDataSourceRequest>,
    ) -> Result<Response<CloseDataSourceResponse>, Status> {
        Ok(Response::new(Self::close_datasource(self, request.into_inner())))
    }

    async fn create_llm(
        &self,
        request: Request<CreateLlmRequest>,
    ) -> Result<Response<CreateLlmResponse>, Status> {
        Ok(Response::new(Self::create_llm(self, request.into_inner())))
    }

    async fn generate_llm(
        &self,
        request: Request<GenerateLlmRequest>,
    ) -> Result<Response<GenerateLlmResponse>, Status> {
        Ok(Response::new(Self::generate_llm(self, request.into_inner())))
    }

    async fn chat_llm(
        &self,
        request: Request<ChatLlmRequest>,
    ) -> Result<Response<ChatLlmResponse>, Status> {
        Ok(Response::new(Self::chat_llm(self, request.into_inner())))
    }

    async fn embedding_llm(
        &self,
        request: Request<EmbeddingLlmRequest>,
    ) -> Result<Response<EmbeddingLlmResponse>, Status> {
        Ok(Response::new(Self::embedding_llm(self, request.into_inner())))
    }

    async fn ping_llm(
        &self,
        request: Request<PingLlmRequest>,
    ) -> Result<Response<PingLlmResponse>, Status> {
        Ok(Response::new(Self::ping_llm(self, request.into_inner())))
    }

    async fn close_llm(
        &self,
        request: Request<CloseLlmRequest>,
    ) -> Result<Response<CloseLlmResponse>, Status> {
        Ok(Response::new(Self::close_llm(self, request.into_inner())))
    }
}
