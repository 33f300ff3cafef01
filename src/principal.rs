//! Principal identity and known-identifier derivation.
//!
//! A principal is the authenticated actor performing an operation. Task
//! assignment data stores a free-text owner reference, so each principal
//! exposes the ordered set of strings that could legitimately represent it:
//! the primary id, the business employee id, the email, and the email local
//! part (text before '@').

use serde::{Deserialize, Serialize};

/// Role of a principal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Employee,
}

/// The authenticated actor performing an operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Principal {
    /// Opaque primary identity (account id)
    pub id: String,
    /// Display name
    pub name: String,
    /// Business identifier, e.g. "EMP001"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Ordered set of non-empty strings that may appear as this principal's
    /// owner reference on a task: id, employee id, email, email local part.
    /// De-duplicated, insertion order preserved.
    pub fn known_identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = Vec::new();
        let mut push = |value: Option<&str>| {
            if let Some(candidate) = non_empty(value) {
                if !identifiers.iter().any(|existing| existing == candidate) {
                    identifiers.push(candidate.to_string());
                }
            }
        };

        push(Some(self.id.as_str()));
        push(self.employee_id.as_deref());
        push(self.email.as_deref());
        push(self.email_local_part());

        identifiers
    }

    /// Text before '@' in the email, if any
    pub fn email_local_part(&self) -> Option<&str> {
        let email = non_empty(self.email.as_deref())?;
        let local = email.split('@').next().unwrap_or("");
        if local.is_empty() {
            None
        } else {
            Some(local)
        }
    }
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
