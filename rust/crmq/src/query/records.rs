//! Deterministic record synthesis standing in for CRM query execution.
//!
//! Every value is a pure function of the object kind, the record index and
//! the record count; nothing is random or cached.

use super::access::check_object_access;
use crate::{
    models::{
        AccountRow, ContactRow, GenericRow, MockRecord, OpportunityRow, PermissionContext,
    },
    parser::{parse_statement, resolve_statement, ParsedStatement},
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

pub const INDUSTRIES: [&str; 5] = [
    "Technology",
    "Finance",
    "Healthcare",
    "Manufacturing",
    "Retail",
];
pub const ACCOUNT_TYPES: [&str; 4] = ["Customer", "Partner", "Prospect", "Other"];
pub const FIRST_NAMES: [&str; 5] = ["John", "Jane", "Alex", "Emma", "Michael"];
pub const LAST_NAMES: [&str; 5] = ["Smith", "Johnson", "Williams", "Brown", "Jones"];
pub const STAGES: [&str; 5] = [
    "Prospecting",
    "Qualification",
    "Needs Analysis",
    "Closed Won",
    "Closed Lost",
];

const DEFAULT_RECORD_COUNT: usize = 5;
const AGGREGATE_RECORD_COUNT: usize = 10;
const CLOSE_YEAR: i32 = 2025;

/// Supported object kinds, dispatched on the lower-cased object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Account,
    Contact,
    Opportunity,
    Generic,
}

impl ObjectKind {
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::to_lowercase).as_deref() {
            Some("account") => ObjectKind::Account,
            Some("contact") => ObjectKind::Contact,
            Some("opportunity") => ObjectKind::Opportunity,
            _ => ObjectKind::Generic,
        }
    }
}

/// 10 records when the description asks for a count, 5 otherwise.
pub fn record_count(description: &str) -> usize {
    let lowered = description.to_lowercase();
    if lowered.contains("count") || lowered.contains("how many") {
        AGGREGATE_RECORD_COUNT
    } else {
        DEFAULT_RECORD_COUNT
    }
}

fn crm_id(prefix: &str, index: usize) -> String {
    format!("{prefix}{index:09}")
}

fn account(i: usize) -> AccountRow {
    AccountRow {
        id: crm_id("001", i),
        name: format!("Sample Account {i}"),
        industry: INDUSTRIES[i % INDUSTRIES.len()],
        account_type: ACCOUNT_TYPES[i % ACCOUNT_TYPES.len()],
        annual_revenue: i as u64 * 100_000,
        number_of_employees: i as u64 * 10 + 5,
    }
}

fn contact(i: usize) -> ContactRow {
    let first_name = FIRST_NAMES[i % FIRST_NAMES.len()];
    let last_name = LAST_NAMES[i % LAST_NAMES.len()];
    ContactRow {
        id: crm_id("003", i),
        first_name,
        last_name,
        email: format!("{first_name}.{last_name}@example.com").to_lowercase(),
        phone: format!("(555) 555-{i:04}"),
        account_id: crm_id("001", i % 3),
    }
}

fn opportunity(i: usize) -> OpportunityRow {
    let stage = STAGES[i % STAGES.len()];
    let month = (i % 12) as u32 + 1;
    OpportunityRow {
        id: crm_id("006", i),
        name: format!("Sample Opportunity {i}"),
        amount: (i as u64 + 1) * 10_000,
        close_date: NaiveDate::from_ymd_opt(CLOSE_YEAR, month, 15).unwrap_or_default(),
        stage_name: stage,
        is_closed: stage.contains("Closed"),
        is_won: stage == "Closed Won",
        account_id: crm_id("001", i % 5),
    }
}

fn generic(i: usize) -> GenericRow {
    GenericRow {
        id: format!("record_{i}"),
        name: format!("Record {i}"),
    }
}

/// Synthesizes records for a parsed statement. The field list is advisory;
/// every generator emits its full fixed shape.
pub fn generate(statement: &ParsedStatement, description: &str) -> Vec<MockRecord> {
    let count = record_count(description);
    let kind = ObjectKind::from_name(statement.object_name.as_deref());
    debug!(?kind, count, fields = ?statement.fields, "generating mock records");

    (0..count)
        .map(|i| match kind {
            ObjectKind::Account => MockRecord::Account(account(i)),
            ObjectKind::Contact => MockRecord::Contact(contact(i)),
            ObjectKind::Opportunity => MockRecord::Opportunity(opportunity(i)),
            ObjectKind::Generic => MockRecord::Generic(generic(i)),
        })
        .collect()
}

/// Output of the data-retrieval tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordSet {
    Rows {
        soql: String,
        object: Option<String>,
        fields: Vec<String>,
        data: Vec<MockRecord>,
    },
    Denied {
        error: String,
        soql: String,
        object: String,
    },
}

impl RecordSet {
    pub fn rows(&self) -> &[MockRecord] {
        match self {
            RecordSet::Rows { data, .. } => data,
            RecordSet::Denied { .. } => &[],
        }
    }
}

/// Resolves a statement for the description, checks object access, and
/// synthesizes matching records.
pub fn run(description: &str, context: Option<&PermissionContext>) -> RecordSet {
    let soql = resolve_statement(description);
    let parsed = parse_statement(&soql);

    if let Some(object) = parsed.object_name.as_deref() {
        if !check_object_access(object, context) {
            warn!(object, "object access denied for record retrieval");
            return RecordSet::Denied {
                error: format!("The current user does not have access to the {object} object."),
                soql,
                object: object.to_string(),
            };
        }
    }

    let data = generate(&parsed, description);
    RecordSet::Rows {
        soql,
        object: parsed.object_name,
        fields: parsed.fields,
        data,
    }
}
