pub mod access;
pub mod extract;
pub mod records;
pub mod viz;

use crate::{
    error::{Result, ServiceError},
    llm::{generate_with_timeout, SharedGenerator},
    models::PermissionContext,
    prompt::StageTask,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use self::access::{check_text, AccessLookup};

const PERMISSION_KEYWORDS: &[&str] = &[
    "access",
    "permission",
    "field-level security",
    "fls",
    "can i see",
    "can i edit",
    "can i update",
    "can i create",
    "visible",
    "editable",
    "have access",
    "have permission",
];

const VISUALIZATION_KEYWORDS: &[&str] = &[
    "chart",
    "graph",
    "plot",
    "visualization",
    "visualize",
    "dashboard",
    "report",
    "show me",
    "display",
    "trend",
    "distribution",
    "comparison",
    "pie chart",
    "bar graph",
    "line chart",
    "histogram",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    FieldAccess,
    Visualization,
    Data,
}

fn mentions_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| lowered.contains(kw))
}

/// Picks the pipeline for a question. Permission intent outranks
/// visualization intent.
pub fn route(query_text: &str) -> Pipeline {
    let lowered = query_text.to_lowercase();
    if mentions_any(&lowered, PERMISSION_KEYWORDS) {
        Pipeline::FieldAccess
    } else if mentions_any(&lowered, VISUALIZATION_KEYWORDS) {
        Pipeline::Visualization
    } else {
        Pipeline::Data
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query_text: String,
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub context: Option<PermissionContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_access: Option<bool>,
    /// Chart.js object, passed through as decoded from the generator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization: Option<Value>,
    pub query_text: String,
}

impl QueryResponse {
    fn text(query_text: &str, text: String) -> Self {
        Self {
            text,
            error: None,
            field_access: None,
            visualization: None,
            query_text: query_text.to_string(),
        }
    }

    fn failure(query_text: &str, err: &ServiceError) -> Self {
        let reason = err.to_string();
        Self {
            error: Some(reason.clone()),
            ..Self::text(
                query_text,
                format!(
                    "I encountered an error processing your query: {reason}. Please try a \
                     different question or contact your administrator."
                ),
            )
        }
    }
}

/// Runs questions through the pipeline chosen by [`route`]. Holds no
/// per-request state; the caller's permission context travels as an
/// argument through every stage.
#[derive(Clone)]
pub struct QueryEngine {
    generator: SharedGenerator,
    call_timeout: Duration,
}

impl QueryEngine {
    pub fn new(generator: SharedGenerator, call_timeout: Duration) -> Self {
        Self {
            generator,
            call_timeout,
        }
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub async fn process(&self, request: QueryRequest) -> Result<QueryResponse> {
        let query_text = request.query_text.trim();
        if query_text.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "query_text must not be empty".into(),
            ));
        }

        let pipeline = route(query_text);
        let context = request.context.as_ref().filter(|ctx| !ctx.is_empty());
        let span = info_span!(
            "process_query",
            request_id = %Uuid::new_v4(),
            user_id = %request.user_id,
            ?pipeline
        );

        let outcome = async {
            info!(username = %request.username, has_context = context.is_some(), "processing query");
            match pipeline {
                Pipeline::FieldAccess => self.field_access(query_text, context).await,
                Pipeline::Visualization => self.visualization(query_text, context).await,
                Pipeline::Data => self.data(query_text, context).await,
            }
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(response) => Ok(response),
            Err(err) if err.is_collaborator() => {
                warn!(error = %err, ?pipeline, "text generation failed; returning error payload");
                Ok(QueryResponse::failure(query_text, &err))
            }
            Err(err) => Err(err),
        }
    }

    async fn stage(&self, task: StageTask) -> Result<String> {
        generate_with_timeout(self.generator.as_ref(), &task, self.call_timeout).await
    }

    async fn field_access(
        &self,
        query_text: &str,
        context: Option<&PermissionContext>,
    ) -> Result<QueryResponse> {
        let result = match check_text(query_text, context) {
            AccessLookup::Decision(decision) => {
                info!(object = %decision.object, field = %decision.field, has_access = decision.has_access, "field access checked");
                format!(
                    "Field Access Check: {}",
                    serde_json::to_string_pretty(&decision)?
                )
            }
            unresolved @ AccessLookup::Unresolved { .. } => {
                let lookup = serde_json::to_string_pretty(&unresolved)?;
                self.stage(StageTask::investigate_access(query_text, lookup))
                    .await?
            }
        };

        let text = self
            .stage(StageTask::format_access(query_text, result))
            .await?;

        Ok(QueryResponse {
            field_access: Some(true),
            ..QueryResponse::text(query_text, text)
        })
    }

    async fn visualization(
        &self,
        query_text: &str,
        context: Option<&PermissionContext>,
    ) -> Result<QueryResponse> {
        let analysis = self
            .stage(StageTask::analyze_visualization(query_text))
            .await?;
        let data = self.retrieve(query_text, &analysis, context).await?;

        let reply = self
            .stage(StageTask::build_chart(
                &analysis,
                &data,
                viz::render(query_text),
            ))
            .await?;
        let chart = viz::decode_chart(&reply);

        let text = self
            .stage(StageTask::explain_chart(query_text, &analysis, data))
            .await?;

        Ok(QueryResponse {
            visualization: Some(chart),
            ..QueryResponse::text(query_text, text)
        })
    }

    async fn data(
        &self,
        query_text: &str,
        context: Option<&PermissionContext>,
    ) -> Result<QueryResponse> {
        let analysis = self
            .stage(StageTask::analyze_data_query(query_text))
            .await?;
        let data = self.retrieve(query_text, &analysis, context).await?;
        let text = self
            .stage(StageTask::format_data(query_text, &analysis, data))
            .await?;

        Ok(QueryResponse::text(query_text, text))
    }

    /// Record tool followed by the narration stage.
    async fn retrieve(
        &self,
        query_text: &str,
        analysis: &str,
        context: Option<&PermissionContext>,
    ) -> Result<String> {
        let records = records::run(&format!("{query_text}\n{analysis}"), context);
        info!(rows = records.rows().len(), "mock records retrieved");
        let encoded = serde_json::to_string_pretty(&records)?;
        self.stage(StageTask::narrate_records(analysis, encoded))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        llm::{EchoGenerator, TextGenerator},
        prompt::Stage,
    };
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Replies per stage, falling back to echoing the evidence.
    #[derive(Default)]
    struct Scripted {
        replies: Vec<(Stage, String)>,
        fail_on: Option<Stage>,
        seen: Mutex<Vec<StageTask>>,
    }

    impl Scripted {
        fn reply(mut self, stage: Stage, text: &str) -> Self {
            self.replies.push((stage, text.to_string()));
            self
        }

        fn fail_on(mut self, stage: Stage) -> Self {
            self.fail_on = Some(stage);
            self
        }

        fn stages(&self) -> Vec<Stage> {
            self.seen.lock().unwrap().iter().map(|t| t.stage).collect()
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, task: &StageTask) -> Result<String> {
            self.seen.lock().unwrap().push(task.clone());
            if self.fail_on == Some(task.stage) {
                return Err(ServiceError::Collaborator("upstream unavailable".into()));
            }
            let scripted = self
                .replies
                .iter()
                .find(|(stage, _)| *stage == task.stage)
                .map(|(_, text)| text.clone());
            match scripted {
                Some(text) => Ok(text),
                None => EchoGenerator.generate(task).await,
            }
        }
    }

    fn engine(generator: Arc<Scripted>) -> QueryEngine {
        QueryEngine::new(generator, Duration::from_secs(5))
    }

    fn request(query_text: &str, context: Option<PermissionContext>) -> QueryRequest {
        QueryRequest {
            query_text: query_text.to_string(),
            user_id: "005000000000001".into(),
            username: "rep@example.com".into(),
            context,
        }
    }

    fn sales_rep() -> PermissionContext {
        PermissionContext {
            profile: Some("Sales Rep".into()),
            ..Default::default()
        }
    }

    #[test]
    fn permission_intent_outranks_visualization() {
        assert_eq!(route("Can I see the chart of Account.Rating?"), Pipeline::FieldAccess);
        assert_eq!(route("show me a dashboard I have access to"), Pipeline::FieldAccess);
        assert_eq!(route("Show me a pie chart of accounts"), Pipeline::Visualization);
        assert_eq!(route("List open opportunities"), Pipeline::Data);
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let err = engine(Arc::new(Scripted::default()))
            .process(request("   ", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn dotted_field_is_checked_without_investigation() {
        let generator = Arc::new(Scripted::default());
        let response = engine(generator.clone())
            .process(request("Can I see Account.Rating?", Some(sales_rep())))
            .await
            .unwrap();

        assert_eq!(response.field_access, Some(true));
        assert!(response.text.starts_with("Field Access Check: "));
        assert!(response.text.contains("\"hasAccess\": false"));
        assert_eq!(generator.stages(), vec![Stage::Formatting]);
    }

    #[tokio::test]
    async fn unresolved_field_falls_back_to_security_stage() {
        let generator = Arc::new(
            Scripted::default().reply(Stage::Formatting, "You cannot see salaries."),
        );
        let response = engine(generator.clone())
            .process(request("can I see salaries?", None))
            .await
            .unwrap();

        assert_eq!(response.text, "You cannot see salaries.");
        assert_eq!(generator.stages(), vec![Stage::Security, Stage::Formatting]);
        let seen = generator.seen.lock().unwrap();
        let evidence = seen[0].evidence.as_deref().unwrap();
        assert!(evidence.contains(access::UNRESOLVED_FIELD_ERROR));
    }

    #[tokio::test]
    async fn visualization_pipeline_decodes_echoed_chart() {
        let generator = Arc::new(Scripted::default());
        let response = engine(generator.clone())
            .process(request("Show me a pie chart of accounts by industry", None))
            .await
            .unwrap();

        let chart = response.visualization.expect("chart expected");
        assert_eq!(chart["type"], serde_json::json!("pie"));
        assert_eq!(chart["title"], serde_json::json!("Accounts by Industry"));
        assert_eq!(
            generator.stages(),
            vec![
                Stage::Analysis,
                Stage::DataRetrieval,
                Stage::Visualization,
                Stage::Formatting
            ]
        );
    }

    #[tokio::test]
    async fn chatty_chart_reply_becomes_placeholder() {
        let generator = Arc::new(
            Scripted::default().reply(Stage::Visualization, "Sorry, I cannot draw that."),
        );
        let response = engine(generator)
            .process(request("plot the pipeline", None))
            .await
            .unwrap();
        assert_eq!(
            response.visualization,
            Some(viz::ChartSpec::placeholder().into_value())
        );
    }

    #[tokio::test]
    async fn data_pipeline_narrates_records() {
        let generator = Arc::new(Scripted::default().reply(Stage::Analysis, "contacts"));
        let response = engine(generator.clone())
            .process(request("List my contacts", None))
            .await
            .unwrap();

        assert!(response.visualization.is_none() && response.field_access.is_none());
        assert!(response.text.contains("\"FirstName\": \"John\""));
        assert_eq!(
            generator.stages(),
            vec![Stage::Analysis, Stage::DataRetrieval, Stage::Formatting]
        );
    }

    #[tokio::test]
    async fn object_denial_reaches_the_narration() {
        let mut ctx = sales_rep();
        ctx.object_permissions.insert(
            "Opportunity".into(),
            crate::models::ObjectPermission {
                is_accessible: Some(false),
            },
        );
        let generator = Arc::new(Scripted::default().reply(Stage::Analysis, "opportunities"));
        let response = engine(generator)
            .process(request("list open deals", Some(ctx)))
            .await
            .unwrap();
        assert!(response
            .text
            .contains("does not have access to the Opportunity object"));
    }

    #[tokio::test]
    async fn collaborator_failure_becomes_error_payload() {
        let generator = Arc::new(Scripted::default().fail_on(Stage::Analysis));
        let response = engine(generator)
            .process(request("List my contacts", None))
            .await
            .unwrap();

        let error = response.error.expect("error expected");
        assert!(error.contains("upstream unavailable"));
        assert!(response
            .text
            .starts_with("I encountered an error processing your query: "));
        assert_eq!(response.query_text, "List my contacts");
    }
}
