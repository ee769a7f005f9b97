use crate::{
    config::AppConfig,
    error::{Result, ServiceError},
    llm::{EchoGenerator, GeminiClient, SharedGenerator},
    query::{QueryEngine, QueryRequest, QueryResponse},
    state::AppState,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use http::{HeaderValue, Method};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

pub struct Server {
    config: Arc<AppConfig>,
    state: AppState,
}

impl Server {
    /// Uses the Gemini client when an API key is configured, otherwise the
    /// offline echo generator.
    pub fn new(config: AppConfig) -> Result<Self> {
        let generator: SharedGenerator = match config.llm.clone() {
            Some(llm) => Arc::new(GeminiClient::new(llm)?),
            None => {
                warn!("no text-generation API key configured; answering offline");
                Arc::new(EchoGenerator)
            }
        };
        Ok(Self::with_generator(config, generator))
    }

    pub fn with_generator(config: AppConfig, generator: SharedGenerator) -> Self {
        let config = Arc::new(config);
        let query = QueryEngine::new(generator, config.llm_timeout);
        let state = AppState::new(Arc::clone(&config), query);

        Self { config, state }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(Self::root))
            .route("/ping", get(Self::ping))
            .route("/available_models", get(Self::available_models))
            .route("/process_query", post(Self::process_query))
            .with_state(self.state.clone())
            .layer(cors_layer(self.config.allowed_origins.as_deref()))
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.config.listen_addr;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, model = %self.config.model, generator = self.state.query.generator_name(), "CRM query assistant listening");
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
        Json(json!({
            "status": "online",
            "message": format!("CRM query assistant API is running with {}", state.config.model),
        }))
    }

    async fn ping(State(state): State<AppState>) -> Json<serde_json::Value> {
        Json(json!({ "ping": "pong", "status": "ok", "model": state.config.model }))
    }

    async fn available_models(State(state): State<AppState>) -> Json<serde_json::Value> {
        Json(json!({ "models": state.config.available_models() }))
    }

    async fn process_query(
        State(state): State<AppState>,
        payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
    ) -> Result<Json<QueryResponse>> {
        let Json(request) =
            payload.map_err(|rejection| ServiceError::InvalidRequest(rejection.body_text()))?;
        let response = state.query.process(request).await?;
        Ok(Json(response))
    }
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let origins = match allowed_origins {
        Some(origins) => AllowOrigin::list(origins.iter().filter_map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|err| warn!(%origin, error = %err, "ignoring invalid CORS origin"))
                .ok()
        })),
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}
