//! Shared status-transition guard for the three lifecycle resources
//! (applications, reports, evaluations).
//!
//! The contract is uniform: a transition (or a pending-only mutation) is a
//! single conditional statement whose WHERE clause re-asserts both the
//! `pending` precondition and the caller's ownership scope, so the database
//! evaluates the state check atomically with the write. When that statement
//! matches nothing, [`blocked`] runs a scoped status probe purely to pick the
//! right error: a missing or not-owned row and a non-pending row must not be
//! distinguishable from outside the owner's scope.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
            Status::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s {
            "pending" => Some(Status::Pending),
            "approved" => Some(Status::Approved),
            "rejected" => Some(Status::Rejected),
            "completed" => Some(Status::Completed),
            _ => None,
        }
    }

    /// The review lifecycle shared by applications and reports
    pub fn is_review_status(self) -> bool {
        matches!(self, Status::Pending | Status::Approved | Status::Rejected)
    }
}

/// A resource table participating in the pending-only transition contract
#[derive(Debug, Clone, Copy)]
pub struct LifecycleResource {
    pub table: &'static str,
    pub noun: &'static str,
    pub title: &'static str,
}

pub const APPLICATIONS: LifecycleResource = LifecycleResource {
    table: "applications",
    noun: "application",
    title: "Application",
};

pub const REPORTS: LifecycleResource = LifecycleResource {
    table: "reports",
    noun: "report",
    title: "Report",
};

pub const EVALUATIONS: LifecycleResource = LifecycleResource {
    table: "evaluations",
    noun: "evaluation",
    title: "Evaluation",
};

/// Ownership scope of a transition. Student mutations are scoped to the
/// owning student; host-supervisor mutations to rows of the supervisor's own
/// organization; reviewer transitions are unscoped.
#[derive(Debug, Clone, Copy)]
pub enum TransitionScope {
    Any,
    Student(i32),
    HostOrganization(i32),
}

impl TransitionScope {
    /// SQL predicate for this scope, binding its value at placeholder `$n`.
    /// Returns an empty string for the unscoped case.
    pub fn predicate(&self, n: usize) -> String {
        match self {
            TransitionScope::Any => String::new(),
            TransitionScope::Student(_) => format!(" AND student_id = ${n}"),
            TransitionScope::HostOrganization(_) => format!(
                " AND organization_id = (SELECT id FROM organizations WHERE host_supervisor_id = ${n})"
            ),
        }
    }

    pub fn bind_value(&self) -> Option<i32> {
        match self {
            TransitionScope::Any => None,
            TransitionScope::Student(id) | TransitionScope::HostOrganization(id) => Some(*id),
        }
    }
}

fn not_found_message(res: LifecycleResource, scope: &TransitionScope) -> String {
    match scope {
        TransitionScope::Any => format!("{} not found", res.title),
        _ => format!("{} not found or access denied", res.title),
    }
}

fn non_pending_message(res: LifecycleResource, verb: &str) -> String {
    format!("Can only {} pending {}s", verb, res.noun)
}

/// Explain why a conditional pending-only write matched no row.
///
/// The write itself already failed atomically; this probe only chooses the
/// error wording, so the race between probe and write can at worst swap one
/// valid error message for another.
pub async fn blocked(
    pool: &PgPool,
    res: LifecycleResource,
    id: i32,
    scope: TransitionScope,
    verb: &str,
) -> ApiError {
    let sql = format!(
        "SELECT status FROM {} WHERE id = $1{}",
        res.table,
        scope.predicate(2)
    );

    let mut query = sqlx::query_scalar::<_, String>(&sql).bind(id);
    if let Some(value) = scope.bind_value() {
        query = query.bind(value);
    }

    match query.fetch_optional(pool).await {
        Ok(None) => ApiError::not_found(not_found_message(res, &scope)),
        Ok(Some(_)) => ApiError::bad_request(non_pending_message(res, verb)),
        Err(e) => ApiError::from(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            Status::Pending,
            Status::Approved,
            Status::Rejected,
            Status::Completed,
        ] {
            assert_eq!(Status::parse(status.as_str()), Some(status));
        }
        assert_eq!(Status::parse("cancelled"), None);
    }

    #[test]
    fn completed_is_not_a_review_status() {
        assert!(Status::Pending.is_review_status());
        assert!(Status::Approved.is_review_status());
        assert!(Status::Rejected.is_review_status());
        assert!(!Status::Completed.is_review_status());
    }

    #[test]
    fn scope_predicates() {
        assert_eq!(TransitionScope::Any.predicate(2), "");
        assert_eq!(
            TransitionScope::Student(7).predicate(2),
            " AND student_id = $2"
        );
        assert_eq!(
            TransitionScope::HostOrganization(3).predicate(4),
            " AND organization_id = (SELECT id FROM organizations WHERE host_supervisor_id = $4)"
        );
    }

    #[test]
    fn scoped_and_unscoped_not_found_wording() {
        assert_eq!(
            not_found_message(APPLICATIONS, &TransitionScope::Any),
            "Application not found"
        );
        assert_eq!(
            not_found_message(REPORTS, &TransitionScope::Student(1)),
            "Report not found or access denied"
        );
        assert_eq!(
            not_found_message(EVALUATIONS, &TransitionScope::HostOrganization(1)),
            "Evaluation not found or access denied"
        );
    }

    #[test]
    fn non_pending_wording_matches_contract() {
        assert_eq!(
            non_pending_message(APPLICATIONS, "approve"),
            "Can only approve pending applications"
        );
        assert_eq!(
            non_pending_message(REPORTS, "delete"),
            "Can only delete pending reports"
        );
        assert_eq!(
            non_pending_message(EVALUATIONS, "update"),
            "Can only update pending evaluations"
        );
    }
}
