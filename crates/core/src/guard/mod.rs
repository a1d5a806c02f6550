//! Textual query guards.
//!
//! Two pure, synchronous checks gate every candidate query:
//!
//! 1. [`safety::evaluate`]: read-only, single-statement policy.
//! 2. [`isolation::has_isolation`]: the candidate must pin the tenant column
//!    to the caller's tenant.
//!
//! Both are substring scanners, not SQL parsers. They are conservative
//! (false rejections are acceptable, false admissions are not) but they can be
//! fooled by constructs a parser would see through: a predicate inside an `OR`,
//! a predicate applied to the wrong table, or a denylisted word inside a string
//! literal (which only ever causes a false rejection). Replacing them with a
//! checked statement shape keeps the contract: anything rejected here must
//! stay rejected.

pub mod isolation;
pub mod safety;

use thiserror::Error;

use crate::id::TenantId;

pub use isolation::has_isolation;
pub use safety::evaluate;

/// Why a candidate query was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DenyReason {
    #[error("query is empty")]
    Empty,

    #[error("query must start with {}", safety::ALLOWED_KEYWORD)]
    NotReadOnly,

    #[error("contains forbidden keyword: {0}")]
    ForbiddenKeyword(&'static str),

    #[error("contains forbidden comment marker: {0}")]
    Comment(&'static str),

    #[error("contains multiple statements")]
    MultipleStatements,

    #[error("query must include tenant isolation (tenant_id = '{tenant_id}')")]
    MissingTenantIsolation { tenant_id: String },
}

impl DenyReason {
    /// Which guard produced the denial.
    pub fn check(&self) -> &'static str {
        match self {
            DenyReason::MissingTenantIsolation { .. } => "tenant_isolation",
            _ => "safety_policy",
        }
    }
}

/// Safety policy decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Denied(DenyReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }

    pub fn reason(&self) -> Option<&DenyReason> {
        match self {
            Verdict::Allowed => None,
            Verdict::Denied(r) => Some(r),
        }
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Verdict::Allowed => Ok(()),
            Verdict::Denied(r) => Err(r),
        }
    }
}

/// Run both guards, safety first. The isolation check is skipped when the
/// safety policy already denied the query.
pub fn validate_candidate(query: &str, tenant_id: &TenantId) -> Result<(), DenyReason> {
    evaluate(query).into_result()?;

    if !has_isolation(query, tenant_id.as_str()) {
        return Err(DenyReason::MissingTenantIsolation {
            tenant_id: tenant_id.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(s: &str) -> TenantId {
        TenantId::parse(s).unwrap()
    }

    #[test]
    fn valid_candidate_passes_both_guards() {
        let q = "SELECT COUNT(*) FROM users WHERE tenant_id = 'tenant_123'";
        assert_eq!(validate_candidate(q, &tenant("tenant_123")), Ok(()));
    }

    #[test]
    fn safety_denial_wins_over_missing_isolation() {
        let err = validate_candidate("DROP TABLE users", &tenant("t1")).unwrap_err();
        assert_eq!(err, DenyReason::ForbiddenKeyword("DROP"));
        assert_eq!(err.check(), "safety_policy");
    }

    #[test]
    fn missing_predicate_is_reported_with_tenant() {
        let err = validate_candidate("SELECT count(*) FROM users", &tenant("t1")).unwrap_err();
        assert_eq!(err.check(), "tenant_isolation");
        assert_eq!(
            err.to_string(),
            "query must include tenant isolation (tenant_id = 't1')"
        );
    }

    #[test]
    fn denial_reasons_read_naturally() {
        assert_eq!(
            DenyReason::ForbiddenKeyword("DROP").to_string(),
            "contains forbidden keyword: DROP"
        );
        assert_eq!(DenyReason::NotReadOnly.to_string(), "query must start with SELECT");
    }
}
