//! Field- and object-level access decisions against a caller-supplied
//! permission context. Missing information always resolves to "allowed".

use super::extract::extract_field_ref;
use crate::models::PermissionContext;
use serde::Serialize;

/// Profiles that see every field when no explicit entry exists.
pub const ADMIN_PROFILES: [&str; 2] = ["System Administrator", "Custom Admin"];

/// Fields hidden from non-admin profiles when no explicit entry exists.
pub const RESTRICTED_FIELDS: [&str; 6] = [
    "Rating",
    "AnnualRevenue",
    "Ownership",
    "Salary__c",
    "Internal_Notes__c",
    "Confidential__c",
];

pub const UNRESOLVED_FIELD_ERROR: &str = "Couldn't identify object and field in the query";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
    pub has_access: bool,
    pub message: String,
    pub object: String,
    pub field: String,
    pub is_updateable: bool,
    pub is_createable: bool,
}

/// Result of checking access for a free-text question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AccessLookup {
    Decision(AccessDecision),
    Unresolved { error: String, query: String },
}

fn effective(context: Option<&PermissionContext>) -> Option<&PermissionContext> {
    context.filter(|ctx| !ctx.is_empty())
}

/// Strips namespace prefixes: `ns.Account.Rating` -> `Rating`.
pub fn normalize_field(field: &str) -> &str {
    field.rsplit('.').next().unwrap_or(field)
}

pub fn check_field_access(
    object: &str,
    field: &str,
    context: Option<&PermissionContext>,
) -> AccessDecision {
    let field = normalize_field(field);
    let decision = |has_access: bool, message: String| AccessDecision {
        has_access,
        message,
        object: object.to_string(),
        field: field.to_string(),
        is_updateable: false,
        is_createable: false,
    };

    let Some(ctx) = effective(context) else {
        return decision(
            true,
            "No user context provided, assuming access is granted".to_string(),
        );
    };

    if let Some(perms) = ctx.field(object, field) {
        let message = if perms.is_accessible {
            format!("The field {object}.{field} is accessible to the current user.")
        } else {
            format!("The field {object}.{field} is not accessible to the current user.")
        };
        return AccessDecision {
            is_updateable: perms.is_updateable,
            is_createable: perms.is_createable,
            ..decision(perms.is_accessible, message)
        };
    }

    let profile = ctx.profile();
    if ADMIN_PROFILES.contains(&profile) {
        return decision(
            true,
            format!("The user's profile ({profile}) has access to all fields."),
        );
    }

    if RESTRICTED_FIELDS.contains(&field) {
        decision(
            false,
            format!(
                "The field {object}.{field} is not visible to the current user's profile {profile}."
            ),
        )
    } else {
        decision(
            true,
            format!(
                "The field {object}.{field} is accessible to the current user's profile {profile}."
            ),
        )
    }
}

/// Fail-open object check: absent context, object entry, or flag all allow.
pub fn check_object_access(object: &str, context: Option<&PermissionContext>) -> bool {
    effective(context)
        .and_then(|ctx| ctx.object_permissions.get(object))
        .and_then(|perms| perms.is_accessible)
        .unwrap_or(true)
}

/// Extracts an object/field pair from the question and checks it.
pub fn check_text(query: &str, context: Option<&PermissionContext>) -> AccessLookup {
    match extract_field_ref(query) {
        Some(found) => AccessLookup::Decision(check_field_access(
            &found.object,
            &found.field,
            context,
        )),
        None => AccessLookup::Unresolved {
            error: UNRESOLVED_FIELD_ERROR.to_string(),
            query: query.to_string(),
        },
    }
}
