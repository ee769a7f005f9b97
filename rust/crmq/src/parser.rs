//! SOQL-like statement handling: pulls an embedded `SELECT ... FROM ...`
//! statement out of free text, fabricates one from keywords when none is
//! present, and splits a statement into its object name and field list.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

/// Structured clause with optional WHERE / ORDER BY / LIMIT tails.
static STATEMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)SELECT\s+[\w.,\s()]+\s+FROM\s+[\w.]+(?:\s+WHERE\s+[\w.=\s'"<>!+\-*/:^&|%$#@,()]+)?(?:\s+ORDER BY\s+[\w.\s,]+)?(?:\s+LIMIT\s+\d+)?"#,
    )
    .expect("statement pattern is valid")
});

static LOOSE_STATEMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)SELECT.*FROM.*").expect("loose pattern is valid"));

static FROM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)FROM\s+(\w+)").expect("from pattern is valid"));

static SELECT_LIST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)SELECT\s+([\w.,\s()]+)\s+FROM").expect("select list pattern is valid")
});

static SUBQUERY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)").expect("subquery pattern is valid"));

pub const ACCOUNT_WITH_CONTACTS: &str =
    "SELECT Id, Name, (SELECT Id, FirstName, LastName FROM Contacts) FROM Account";
pub const ACCOUNT_SUMMARY: &str = "SELECT Id, Name, Industry, Type FROM Account";
pub const CONTACT_SUMMARY: &str = "SELECT Id, FirstName, LastName, Email, Phone FROM Contact";
pub const OPPORTUNITY_SUMMARY: &str =
    "SELECT Id, Name, Amount, CloseDate, StageName FROM Opportunity";
pub const DEFAULT_STATEMENT: &str = "SELECT Id, Name FROM Account LIMIT 10";

/// Object name and projected fields of a statement. `object_name` is `None`
/// only when no `FROM <object>` clause exists, and `fields` is then empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedStatement {
    pub object_name: Option<String>,
    pub fields: Vec<String>,
}

/// Returns the first embedded statement, verbatim.
pub fn extract_statement(text: &str) -> Option<String> {
    [&*STATEMENT_PATTERN, &*LOOSE_STATEMENT_PATTERN]
        .into_iter()
        .find_map(|pattern| pattern.find(text))
        .map(|found| found.as_str().to_string())
}

/// Keyword fallback used when the text embeds no statement. The
/// account+contact check must run before the plain account check.
pub fn synthesize_statement(description: &str) -> &'static str {
    let lowered = description.to_lowercase();

    if lowered.contains("account") {
        if lowered.contains("contact") {
            ACCOUNT_WITH_CONTACTS
        } else {
            ACCOUNT_SUMMARY
        }
    } else if lowered.contains("contact") {
        CONTACT_SUMMARY
    } else if lowered.contains("opportunit") {
        OPPORTUNITY_SUMMARY
    } else {
        DEFAULT_STATEMENT
    }
}

/// Embedded statement if there is one, otherwise a synthesized one.
pub fn resolve_statement(text: &str) -> String {
    extract_statement(text).unwrap_or_else(|| synthesize_statement(text).to_string())
}

/// Splits a statement into object and fields. The object is the first
/// `FROM <word>` in the statement, which for a SELECT list holding a subquery
/// is the subquery's object. Parenthesized subqueries in the field list are
/// collapsed to `SUBQUERY_<n>` placeholders so their commas do not split it.
/// Never fails: an unrecognizable statement yields an empty result.
pub fn parse_statement(statement: &str) -> ParsedStatement {
    let Some(object_name) = FROM_PATTERN
        .captures(statement)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return ParsedStatement::default();
    };

    let fields = SELECT_LIST_PATTERN
        .captures(statement)
        .and_then(|caps| caps.get(1))
        .map(|list| {
            let mut placeholders = 0usize;
            let collapsed = SUBQUERY_PATTERN.replace_all(list.as_str(), |_: &Captures<'_>| {
                let placeholder = format!("SUBQUERY_{placeholders}");
                placeholders += 1;
                placeholder
            });
            collapsed
                .split(',')
                .map(|field| field.trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    ParsedStatement {
        object_name: Some(object_name),
        fields,
    }
}
