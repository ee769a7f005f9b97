//! Chart.js chart assembly and best-effort decoding of generated charts.

use super::extract::{extract_chart_request, ChartRequest, ChartType};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

/// Per-slice colours, drawn cyclically.
pub const PALETTE: [&str; 10] = [
    "rgba(255, 99, 132, 0.6)",
    "rgba(54, 162, 235, 0.6)",
    "rgba(255, 206, 86, 0.6)",
    "rgba(75, 192, 192, 0.6)",
    "rgba(153, 102, 255, 0.6)",
    "rgba(255, 159, 64, 0.6)",
    "rgba(199, 199, 199, 0.6)",
    "rgba(83, 102, 255, 0.6)",
    "rgba(78, 205, 196, 0.6)",
    "rgba(255, 99, 255, 0.6)",
];

const LINE_BORDER: &str = "rgba(75, 192, 192, 1)";
const SCATTER_FILL: &str = "rgba(75, 192, 192, 0.5)";
const PLACEHOLDER_FILL: &str = "rgba(255, 99, 132, 0.2)";
const LINE_TENSION: f64 = 0.1;

const OBJECT_TERMS: [&str; 5] = ["account", "contact", "opportunity", "lead", "case"];

/// Ordered `(phrase, suffix)` pairs. `None` renders as "<Term> Revenue".
const TITLE_SUFFIXES: [(&str, Option<&str>); 10] = [
    ("by industry", Some("Industry")),
    ("by type", Some("Type")),
    ("by stage", Some("Stage")),
    ("by amount", None),
    ("by revenue", None),
    ("by quarter", Some("Quarter")),
    ("by year", Some("Year")),
    ("by source", Some("Source")),
    ("by priority", Some("Priority")),
    ("by status", Some("Status")),
];

/// Chart.js-compatible chart description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub title: String,
    pub data: ChartData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ChartOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    /// Absent for scatter charts, which carry their own x positions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: DatasetValues,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Colors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tension: Option<f64>,
}

impl Dataset {
    fn new(data: DatasetValues) -> Self {
        Self {
            label: None,
            data,
            background_color: None,
            border_width: None,
            fill: None,
            border_color: None,
            tension: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DatasetValues {
    Counts(Vec<i64>),
    Points(Vec<Point>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Colors {
    Single(String),
    PerSlice(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub responsive: bool,
    pub maintain_aspect_ratio: bool,
    pub plugins: ChartPlugins,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartPlugins {
    pub title: TitleOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TitleOptions {
    pub display: bool,
    pub text: String,
}

impl ChartOptions {
    fn titled(title: &str) -> Self {
        Self {
            responsive: true,
            maintain_aspect_ratio: false,
            plugins: ChartPlugins {
                title: TitleOptions {
                    display: true,
                    text: title.to_string(),
                },
            },
        }
    }
}

impl ChartSpec {
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Substitute used whenever a chart cannot be built or decoded.
    pub fn placeholder() -> Self {
        Self {
            chart_type: ChartType::Bar,
            title: "Data Visualization".to_string(),
            data: ChartData {
                labels: Some(vec!["Error".to_string()]),
                datasets: vec![Dataset {
                    label: Some("Error creating visualization".to_string()),
                    background_color: Some(Colors::Single(PLACEHOLDER_FILL.to_string())),
                    ..Dataset::new(DatasetValues::Counts(vec![0]))
                }],
            },
            options: None,
        }
    }
}

/// Fixed category dataset backing a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CannedDataset {
    pub labels: &'static [&'static str],
    pub values: &'static [i64],
    pub label: &'static str,
}

const DEFAULT_DATASET: CannedDataset = CannedDataset {
    labels: &[
        "Category A",
        "Category B",
        "Category C",
        "Category D",
        "Category E",
    ],
    values: &[12, 19, 3, 5, 2],
    label: "Sample Data",
};

/// `(object term, facet terms, dataset)`; a facet list matches on any term.
const CANNED_DATASETS: [(&str, &[&str], CannedDataset); 8] = [
    (
        "account",
        &["industry"],
        CannedDataset {
            labels: &["Technology", "Finance", "Healthcare", "Manufacturing", "Retail"],
            values: &[35, 20, 15, 10, 20],
            label: "Accounts by Industry",
        },
    ),
    (
        "account",
        &["type"],
        CannedDataset {
            labels: &["Customer", "Partner", "Prospect", "Other"],
            values: &[45, 15, 30, 10],
            label: "Accounts by Type",
        },
    ),
    (
        "opportunity",
        &["stage"],
        CannedDataset {
            labels: &[
                "Prospecting",
                "Qualification",
                "Needs Analysis",
                "Closed Won",
                "Closed Lost",
            ],
            values: &[10, 25, 15, 40, 10],
            label: "Opportunities by Stage",
        },
    ),
    (
        "opportunity",
        &["amount", "revenue"],
        CannedDataset {
            labels: &["Q1", "Q2", "Q3", "Q4"],
            values: &[150_000, 225_000, 300_000, 375_000],
            label: "Opportunity Amount by Quarter",
        },
    ),
    (
        "lead",
        &["source"],
        CannedDataset {
            labels: &[
                "Web",
                "Trade Show",
                "Partner Referral",
                "Employee Referral",
                "Other",
            ],
            values: &[30, 15, 25, 20, 10],
            label: "Leads by Source",
        },
    ),
    (
        "case",
        &["priority"],
        CannedDataset {
            labels: &["High", "Medium", "Low"],
            values: &[15, 45, 40],
            label: "Cases by Priority",
        },
    ),
    (
        "case",
        &["status"],
        CannedDataset {
            labels: &["New", "Working", "Escalated", "Closed"],
            values: &[20, 30, 10, 40],
            label: "Cases by Status",
        },
    ),
    (
        "contact",
        &["account"],
        CannedDataset {
            labels: &[
                "Acme Corp",
                "Universal Containers",
                "Salesforce",
                "Microsoft",
                "IBM",
            ],
            values: &[8, 5, 12, 7, 9],
            label: "Contacts by Account",
        },
    ),
];

pub fn colors(count: usize) -> Vec<String> {
    PALETTE
        .iter()
        .cycle()
        .take(count)
        .map(|color| color.to_string())
        .collect()
}

fn capitalize(term: &str) -> String {
    let mut chars = term.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn build_title(description: &str) -> String {
    let lowered = description.to_lowercase();
    let term = OBJECT_TERMS
        .iter()
        .find(|term| lowered.contains(*term))
        .map(|term| capitalize(term))
        .unwrap_or_else(|| "Data".to_string());

    match TITLE_SUFFIXES
        .iter()
        .find(|(phrase, _)| lowered.contains(phrase))
    {
        Some((_, Some(facet))) => format!("{term}s by {facet}"),
        Some((_, None)) => format!("{term} Revenue"),
        None => format!("{term} Visualization"),
    }
}

pub fn resolve_dataset(description: &str) -> CannedDataset {
    let lowered = description.to_lowercase();
    CANNED_DATASETS
        .iter()
        .find(|(object, facets, _)| {
            lowered.contains(object) && facets.iter().any(|facet| lowered.contains(facet))
        })
        .map(|(_, _, dataset)| *dataset)
        .unwrap_or(DEFAULT_DATASET)
}

pub fn assemble(chart_type: ChartType, description: &str) -> ChartSpec {
    let dataset = resolve_dataset(description);
    let title = build_title(description);
    let labels = || Some(dataset.labels.iter().map(|l| l.to_string()).collect());
    let values = || DatasetValues::Counts(dataset.values.to_vec());
    debug!(?chart_type, %title, dataset = dataset.label, "assembling chart");

    let data = match chart_type {
        ChartType::Pie => ChartData {
            labels: labels(),
            datasets: vec![Dataset {
                background_color: Some(Colors::PerSlice(colors(dataset.labels.len()))),
                border_width: Some(1),
                ..Dataset::new(values())
            }],
        },
        ChartType::Line => ChartData {
            labels: labels(),
            datasets: vec![Dataset {
                label: Some(dataset.label.to_string()),
                fill: Some(false),
                border_color: Some(LINE_BORDER.to_string()),
                tension: Some(LINE_TENSION),
                ..Dataset::new(values())
            }],
        },
        ChartType::Scatter => ChartData {
            labels: None,
            datasets: vec![Dataset {
                label: Some(dataset.label.to_string()),
                background_color: Some(Colors::Single(SCATTER_FILL.to_string())),
                ..Dataset::new(DatasetValues::Points(
                    dataset
                        .values
                        .iter()
                        .zip(0..)
                        .map(|(&y, x)| Point { x, y })
                        .collect(),
                ))
            }],
        },
        ChartType::Bar | ChartType::Area => ChartData {
            labels: labels(),
            datasets: vec![Dataset {
                label: Some(dataset.label.to_string()),
                background_color: Some(Colors::PerSlice(colors(dataset.labels.len()))),
                border_width: Some(1),
                ..Dataset::new(values())
            }],
        },
    };

    ChartSpec {
        chart_type,
        options: Some(ChartOptions::titled(&title)),
        title,
        data,
    }
}

/// Chart tool entry point: request text in, serialized chart out. Never
/// fails; a serialization problem yields an "Error" chart payload instead.
pub fn render(request: &str) -> String {
    let ChartRequest { chart_type, facet } = extract_chart_request(request);
    let spec = assemble(chart_type, &facet);

    match serde_json::to_string(&spec) {
        Ok(encoded) => encoded,
        Err(err) => {
            error!(error = %err, "failed to serialize chart");
            let mut payload = ChartSpec::placeholder().into_value();
            payload["title"] = json!("Error");
            payload["error"] = json!(format!("Error creating visualization: {err}"));
            payload.to_string()
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the info string (e.g. "json") on the opening fence line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// JSON object with a `data` member; anything else is not a chart.
fn chart_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|value| value.get("data").is_some())
}

/// Best-effort decoding of chart JSON produced by a text generator. Any
/// Chart.js object passes through untouched, including shapes this module
/// never builds; only undecodable output becomes the placeholder.
pub fn decode_chart(raw: &str) -> Value {
    let text = strip_code_fence(raw.trim());

    if let Some(chart) = chart_object(text) {
        return chart;
    }

    let outermost = text
        .find('{')
        .zip(text.rfind('}'))
        .filter(|(start, end)| start < end)
        .and_then(|(start, end)| chart_object(&text[start..=end]));

    outermost.unwrap_or_else(|| {
        warn!("chart output was not decodable; using placeholder");
        ChartSpec::placeholder().into_value()
    })
}
