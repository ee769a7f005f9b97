//! Pattern-based entity extraction from free text.
//!
//! An object/field pair is only found when the text spells it in one of the
//! literal shapes `Object.Field`, `field X of Object` or
//! `access to Object.Field`. Anything else is a miss, reported as `None`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static DOT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\.(\w+)").expect("dot pattern is valid"));

static FIELD_PHRASE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)field ['"]?(\w+)['"]? (?:of|in|on) ['"]?(\w+)['"]?"#)
        .expect("field phrase pattern is valid")
});

static ACCESS_PHRASE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)access to ['"]?(\w+)\.(\w+)['"]?"#).expect("access phrase pattern is valid")
});

/// A field reference resolved from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub object: String,
    pub field: String,
}

impl FieldRef {
    fn new(object: &str, field: &str) -> Self {
        Self {
            object: object.to_string(),
            field: field.to_string(),
        }
    }
}

/// Independent extraction strategies, tried in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMatcher {
    /// `Object.Field`
    Dot,
    /// `field Rating of Account`; names arrive field-first.
    FieldPhrase,
    /// `access to Object.Field`. Shadowed by `Dot` in the default order.
    AccessPhrase,
}

impl FieldMatcher {
    pub const ORDER: [FieldMatcher; 3] = [
        FieldMatcher::Dot,
        FieldMatcher::FieldPhrase,
        FieldMatcher::AccessPhrase,
    ];

    pub fn apply(self, text: &str) -> Option<FieldRef> {
        match self {
            FieldMatcher::Dot => {
                let caps = DOT_PATTERN.captures(text)?;
                Some(FieldRef::new(&caps[1], &caps[2]))
            }
            FieldMatcher::FieldPhrase => {
                let caps = FIELD_PHRASE_PATTERN.captures(text)?;
                Some(FieldRef::new(&caps[2], &caps[1]))
            }
            FieldMatcher::AccessPhrase => {
                let caps = ACCESS_PHRASE_PATTERN.captures(text)?;
                Some(FieldRef::new(&caps[1], &caps[2]))
            }
        }
    }
}

/// First successful matcher in [`FieldMatcher::ORDER`].
pub fn extract_field_ref(text: &str) -> Option<FieldRef> {
    extract_field_ref_with(text, &FieldMatcher::ORDER)
}

pub fn extract_field_ref_with(text: &str, matchers: &[FieldMatcher]) -> Option<FieldRef> {
    matchers.iter().find_map(|matcher| matcher.apply(text))
}

/// Chart kinds the visualization tool can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartType {
    Bar,
    Pie,
    Line,
    Scatter,
    Area,
}

const CHART_KEYWORDS: &[(ChartType, &[&str])] = &[
    (ChartType::Pie, &["pie", "distribution"]),
    (ChartType::Line, &["line", "trend", "over time"]),
    (ChartType::Scatter, &["scatter", "correlation"]),
    (ChartType::Area, &["area"]),
];

/// Visualization type plus the text describing what to plot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    pub chart_type: ChartType,
    pub facet: String,
}

/// Picks the chart type from the first matching keyword group, defaulting
/// to a bar chart. The whole request is kept as the data facet.
pub fn extract_chart_request(text: &str) -> ChartRequest {
    let lowered = text.to_lowercase();
    let chart_type = CHART_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|(chart_type, _)| *chart_type)
        .unwrap_or(ChartType::Bar);

    ChartRequest {
        chart_type,
        facet: text.to_string(),
    }
}
