//! Clients for the external text-generation service.

use crate::{
    error::{Result, ServiceError},
    prompt::StageTask,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tracing::debug;

/// Opaque collaborator that turns a stage task into free text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, task: &StageTask) -> Result<String>;
}

pub type SharedGenerator = Arc<dyn TextGenerator>;

/// Runs one stage call under a hard deadline.
pub async fn generate_with_timeout(
    generator: &dyn TextGenerator,
    task: &StageTask,
    timeout: Duration,
) -> Result<String> {
    debug!(stage = ?task.stage, generator = generator.name(), "invoking text generator");
    match tokio::time::timeout(timeout, generator.generate(task)).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::CollaboratorTimeout(timeout)),
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: Arc<GeminiConfig>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ServiceError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

fn candidate_text(body: GenerateResponse) -> Option<String> {
    let content = body.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|part| part.text).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, task: &StageTask) -> Result<String> {
        let payload = json!({
            "systemInstruction": { "parts": [{ "text": task.stage.system_prompt() }] },
            "contents": [{ "role": "user", "parts": [{ "text": task.prompt() }] }],
            "generationConfig": { "temperature": self.config.temperature },
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ServiceError::CollaboratorTimeout(self.config.timeout)
                } else {
                    ServiceError::Collaborator(format!("request failed: {err}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Collaborator(format!(
                "service returned status {status}: {body}"
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|err| ServiceError::Collaborator(format!("unreadable response: {err}")))?;

        candidate_text(body)
            .ok_or_else(|| ServiceError::Collaborator("response contained no text".into()))
    }
}

/// Offline stand-in that answers every task with its tool output, or with
/// the task text when there is none.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGenerator;

#[async_trait]
impl TextGenerator for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, task: &StageTask) -> Result<String> {
        Ok(task
            .evidence
            .clone()
            .unwrap_or_else(|| task.description.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Stage;

    struct Stalled;

    #[async_trait]
    impl TextGenerator for Stalled {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn generate(&self, _task: &StageTask) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn echo_prefers_evidence() {
        let task = StageTask::new(Stage::Formatting, "format this").with_evidence("{\"a\":1}");
        let text = EchoGenerator.generate(&task).await.unwrap();
        assert_eq!(text, "{\"a\":1}");

        let bare = StageTask::new(Stage::Analysis, "analyze this");
        assert_eq!(EchoGenerator.generate(&bare).await.unwrap(), "analyze this");
    }

    #[tokio::test]
    async fn stalled_generator_hits_deadline() {
        let task = StageTask::new(Stage::Analysis, "anything");
        let err = generate_with_timeout(&Stalled, &task, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::CollaboratorTimeout(d) if d == Duration::from_millis(50)));
    }

    #[test]
    fn candidate_text_joins_parts() {
        let body: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello, " }, { "text": "world" }] } }]
        }))
        .unwrap();
        assert_eq!(candidate_text(body).as_deref(), Some("Hello, world"));

        let empty: GenerateResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(candidate_text(empty).is_none());
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        let client = GeminiClient::new(GeminiConfig {
            base_url: "http://localhost:9999/".into(),
            api_key: "k".into(),
            model: "gemini-1.5-flash".into(),
            temperature: 0.2,
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(client.name(), "gemini-1.5-flash");
    }
}
