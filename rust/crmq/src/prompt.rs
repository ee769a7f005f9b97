//! Stage personas and task text sent to the text-generation service.

use std::fmt;

/// One named step of a query pipeline that talks to the text service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analysis,
    DataRetrieval,
    Security,
    Visualization,
    Formatting,
}

struct Persona {
    role: &'static str,
    goal: &'static str,
    background: &'static str,
}

impl Stage {
    fn persona(self) -> Persona {
        match self {
            Stage::Analysis => Persona {
                role: "Query Analyzer",
                goal: "Understand user queries about CRM data and permissions",
                background: "You are an expert at understanding natural language queries about \
                             CRM data and translating them to actionable tasks. You have deep \
                             knowledge of the CRM data model and its security model.",
            },
            Stage::DataRetrieval => Persona {
                role: "CRM Data Expert",
                goal: "Retrieve accurate data from the CRM based on user queries",
                background: "You are an expert at writing SOQL queries and retrieving CRM data. \
                             You understand relationships between objects and can efficiently \
                             extract the data users need.",
            },
            Stage::Security => Persona {
                role: "CRM Security Expert",
                goal: "Check user permissions and access to CRM objects and fields",
                background: "You are an expert in CRM security, including profiles, permission \
                             sets, field-level security, and sharing rules. You can determine if \
                             users have access to specific data.",
            },
            Stage::Visualization => Persona {
                role: "Data Visualization Expert",
                goal: "Create effective visualizations for CRM data",
                background: "You are an expert in data visualization, particularly with Chart.js. \
                             You create clear, informative charts. When asked for a chart you \
                             reply with the Chart.js JSON object only.",
            },
            Stage::Formatting => Persona {
                role: "Response Formatter",
                goal: "Format AI responses in a clear, concise, and helpful way",
                background: "You are an expert at taking complex information and presenting it \
                             in a format that is easy to understand. You craft responses that are \
                             professional, accurate, and tailored to the user's question.",
            },
        }
    }

    /// System instruction for this stage.
    pub fn system_prompt(self) -> String {
        let persona = self.persona();
        format!(
            "You are the {}.\nGoal: {}\n{}",
            persona.role, persona.goal, persona.background
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.persona().role)
    }
}

/// A single request to the text service: free-text instructions plus the
/// optional tool output they refer to.
#[derive(Debug, Clone)]
pub struct StageTask {
    pub stage: Stage,
    pub description: String,
    pub evidence: Option<String>,
}

impl StageTask {
    pub fn new(stage: Stage, description: impl Into<String>) -> Self {
        Self {
            stage,
            description: description.into(),
            evidence: None,
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    /// User-turn text: the instructions followed by the evidence block.
    pub fn prompt(&self) -> String {
        match &self.evidence {
            Some(evidence) => format!("{}\n\nTool output:\n{}", self.description, evidence),
            None => self.description.clone(),
        }
    }

    pub fn analyze_data_query(query_text: &str) -> Self {
        Self::new(
            Stage::Analysis,
            format!(
                "Analyze this data query: \"{query_text}\"\n\
                 Determine what CRM objects and fields are being referenced and what data needs \
                 to be retrieved."
            ),
        )
    }

    pub fn analyze_visualization(query_text: &str) -> Self {
        Self::new(
            Stage::Analysis,
            format!(
                "Analyze this visualization request: \"{query_text}\"\n\
                 Determine what data needs to be queried and what type of visualization would be \
                 most appropriate."
            ),
        )
    }

    pub fn narrate_records(analysis: &str, records_json: String) -> Self {
        Self::new(
            Stage::DataRetrieval,
            format!(
                "Based on this analysis: \"{analysis}\"\n\
                 Summarize the CRM records retrieved for it."
            ),
        )
        .with_evidence(records_json)
    }

    pub fn investigate_access(query_text: &str, tool_json: String) -> Self {
        Self::new(
            Stage::Security,
            format!(
                "Analyze this query about field access permissions: \"{query_text}\"\n\
                 Identify the object and field being referenced, then check if the user has \
                 access."
            ),
        )
        .with_evidence(tool_json)
    }

    pub fn build_chart(analysis: &str, data: &str, chart_json: String) -> Self {
        Self::new(
            Stage::Visualization,
            format!(
                "Create a visualization based on:\n\
                 Analysis: \"{analysis}\"\n\
                 Data: {data}\n\
                 Reply with the final Chart.js JSON object, starting from the chart below."
            ),
        )
        .with_evidence(chart_json)
    }

    pub fn format_access(query_text: &str, result: String) -> Self {
        Self::new(
            Stage::Formatting,
            format!(
                "Format this field access check result into a clear, professional response:\n\
                 Query: \"{query_text}\""
            ),
        )
        .with_evidence(result)
    }

    pub fn explain_chart(query_text: &str, analysis: &str, data: String) -> Self {
        Self::new(
            Stage::Formatting,
            format!(
                "Create a clear explanation for this visualization:\n\
                 Query: \"{query_text}\"\n\
                 Analysis: \"{analysis}\""
            ),
        )
        .with_evidence(data)
    }

    pub fn format_data(query_text: &str, analysis: &str, data: String) -> Self {
        Self::new(
            Stage::Formatting,
            format!(
                "Format this data result into a clear, professional response:\n\
                 Query: \"{query_text}\"\n\
                 Analysis: \"{analysis}\""
            ),
        )
        .with_evidence(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_appends_evidence_block() {
        let task = StageTask::format_access("can I see Account.Rating?", "{\"hasAccess\":false}".into());
        let prompt = task.prompt();
        assert!(prompt.starts_with("Format this field access check result"));
        assert!(prompt.ends_with("Tool output:\n{\"hasAccess\":false}"));
        assert_eq!(task.stage, Stage::Formatting);
    }

    #[test]
    fn analysis_tasks_carry_no_evidence() {
        let task = StageTask::analyze_data_query("list accounts");
        assert!(task.evidence.is_none());
        assert_eq!(task.prompt(), task.description);
    }

    #[test]
    fn system_prompt_names_the_role() {
        assert!(Stage::Security
            .system_prompt()
            .starts_with("You are the CRM Security Expert."));
        assert_eq!(Stage::Visualization.to_string(), "Data Visualization Expert");
    }
}
