//! Data models shared by the query pipelines: the caller's permission context
//! and the synthesized CRM record shapes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Profile assumed when the context does not name one.
pub const DEFAULT_PROFILE: &str = "Standard User";

/// Caller-supplied permission snapshot. Read-only to the pipelines and
/// scoped to a single request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionContext {
    #[serde(default)]
    pub object_permissions: HashMap<String, ObjectPermission>,
    #[serde(default)]
    pub field_permissions: HashMap<String, HashMap<String, FieldPermission>>,
    #[serde(default)]
    pub profile: Option<String>,
    /// Caller keys outside the permission model, such as user ids.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PermissionContext {
    /// Only an empty mapping counts as no context. Unknown keys still make
    /// the context present, so profile defaults apply.
    pub fn is_empty(&self) -> bool {
        self.object_permissions.is_empty()
            && self.field_permissions.is_empty()
            && self.profile.is_none()
            && self.extra.is_empty()
    }

    pub fn profile(&self) -> &str {
        self.profile.as_deref().unwrap_or(DEFAULT_PROFILE)
    }

    pub fn field(&self, object: &str, field: &str) -> Option<&FieldPermission> {
        self.field_permissions.get(object)?.get(field)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPermission {
    #[serde(default)]
    pub is_accessible: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPermission {
    #[serde(default)]
    pub is_accessible: bool,
    #[serde(default)]
    pub is_updateable: bool,
    #[serde(default)]
    pub is_createable: bool,
}

/// Synthesized Account row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountRow {
    pub id: String,
    pub name: String,
    pub industry: &'static str,
    #[serde(rename = "Type")]
    pub account_type: &'static str,
    pub annual_revenue: u64,
    pub number_of_employees: u64,
}

/// Synthesized Contact row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContactRow {
    pub id: String,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub email: String,
    pub phone: String,
    pub account_id: String,
}

/// Synthesized Opportunity row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OpportunityRow {
    pub id: String,
    pub name: String,
    pub amount: u64,
    pub close_date: NaiveDate,
    pub stage_name: &'static str,
    pub is_closed: bool,
    pub is_won: bool,
    pub account_id: String,
}

/// Placeholder row for objects without a dedicated generator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GenericRow {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MockRecord {
    Account(AccountRow),
    Contact(ContactRow),
    Opportunity(OpportunityRow),
    Generic(GenericRow),
}
