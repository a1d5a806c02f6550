//! Tenant identity.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a tenant (multi-tenant boundary).
///
/// Supplied by the caller on every request and never inferred from query text.
/// The value is only ever *compared* against the candidate query; it is not
/// spliced into SQL by this system.
///
/// Characters that cannot appear inside a single-quoted SQL literal without
/// escaping (`'`, `\`, control characters) are rejected, so the isolation
/// literal `tenant_id = '<id>'` is always well delimited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_tenant_id("must not be empty"));
        }
        if trimmed.len() != value.len() {
            return Err(DomainError::invalid_tenant_id(
                "must not have leading or trailing whitespace",
            ));
        }
        if let Some(c) = value
            .chars()
            .find(|c| *c == '\'' || *c == '\\' || c.is_control())
        {
            return Err(DomainError::invalid_tenant_id(format!(
                "contains forbidden character {c:?}"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for TenantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifier() {
        let t = TenantId::parse("tenant_123").unwrap();
        assert_eq!(t.as_str(), "tenant_123");
        assert_eq!(t.to_string(), "tenant_123");
    }

    #[test]
    fn rejects_empty_and_padded_values() {
        assert!(TenantId::parse("").is_err());
        assert!(TenantId::parse("   ").is_err());
        assert!(TenantId::parse(" t1").is_err());
    }

    #[test]
    fn rejects_quote_backslash_and_control_chars() {
        assert!(TenantId::parse("t1' OR '1'='1").is_err());
        assert!(TenantId::parse("t\\1").is_err());
        assert!(TenantId::parse("t\n1").is_err());
    }

    #[test]
    fn deserialization_goes_through_validation() {
        let ok: TenantId = serde_json::from_str("\"tenant_123\"").unwrap();
        assert_eq!(ok.as_str(), "tenant_123");

        let err = serde_json::from_str::<TenantId>("\"\"");
        assert!(err.is_err());
    }
}
