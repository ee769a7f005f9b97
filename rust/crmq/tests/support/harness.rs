use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{self, Request, StatusCode},
    Router,
};
use crmq::{
    config::{AppConfig, DEFAULT_MODEL},
    error::{Result, ServiceError},
    llm::TextGenerator,
    prompt::{Stage, StageTask},
    server::Server,
};
use serde::Serialize;
use serde_json::Value;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, Once},
    time::Duration,
};
use tower::ServiceExt;

static TRACING_INIT: Once = Once::new();

/// Text generator driven by per-stage replies. Stages without a reply echo
/// their tool output, or the task text when there is none.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Vec<(Stage, String)>,
    failing: Option<Stage>,
    seen: Mutex<Vec<Stage>>,
}

impl ScriptedGenerator {
    #[allow(dead_code)]
    pub fn reply(mut self, stage: Stage, text: impl Into<String>) -> Self {
        self.replies.push((stage, text.into()));
        self
    }

    #[allow(dead_code)]
    pub fn failing_on(mut self, stage: Stage) -> Self {
        self.failing = Some(stage);
        self
    }

    #[allow(dead_code)]
    pub fn stages(&self) -> Vec<Stage> {
        self.seen.lock().expect("stage log poisoned").clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, task: &StageTask) -> Result<String> {
        self.seen.lock().expect("stage log poisoned").push(task.stage);
        if self.failing == Some(task.stage) {
            return Err(ServiceError::Collaborator(format!(
                "scripted failure in {} stage",
                task.stage
            )));
        }

        let reply = self
            .replies
            .iter()
            .find(|(stage, _)| *stage == task.stage)
            .map(|(_, text)| text.clone());
        Ok(reply.unwrap_or_else(|| {
            task.evidence
                .clone()
                .unwrap_or_else(|| task.description.clone())
        }))
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        allowed_origins: None,
        model: DEFAULT_MODEL.to_string(),
        llm: None,
        llm_timeout: Duration::from_secs(5),
    }
}

/// Router over an in-process server; requests never touch the network.
pub struct CrmqTestHarness {
    router: Router,
}

impl CrmqTestHarness {
    pub fn new(generator: Arc<ScriptedGenerator>) -> Self {
        TRACING_INIT.call_once(|| {
            let _ = tracing_subscriber::fmt::try_init();
        });

        let server = Server::with_generator(test_config(), generator);
        Self {
            router: server.router(),
        }
    }

    pub async fn get(&self, path: &str) -> http::Response<Body> {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .expect("failed to build harness request");
        self.send(request).await
    }

    pub async fn post<T>(&self, path: &str, payload: &T) -> http::Response<Body>
    where
        T: Serialize,
    {
        let body = serde_json::to_vec(payload).expect("request payload should serialize");
        self.post_raw(path, body).await
    }

    pub async fn post_raw(&self, path: &str, body: Vec<u8>) -> http::Response<Body> {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .expect("failed to build harness request");
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> http::Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router should handle harness request")
    }
}

pub async fn read_json(response: http::Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("response body should deserialize");
    let value =
        serde_json::from_slice::<Value>(&bytes).expect("response body should be valid JSON");
    (status, value)
}
