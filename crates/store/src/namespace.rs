//! Validated namespace identifiers.
//!
//! A namespace partitions chunks into separate collections. It reaches the
//! backing engine only as a bound parameter, and the names of derived
//! structures (vector index, projection) are built from validated values.

use serde::{Deserialize, Serialize};
use std::fmt;
use vecgraph_core::{AppError, AppResult};

/// Maximum namespace length in characters.
pub const MAX_NAMESPACE_LEN: usize = 64;

/// A namespace label restricted to `[A-Za-z0-9_-]{1,64}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace(String);

impl Namespace {
    /// Validate and wrap a raw namespace label.
    pub fn parse(raw: &str) -> AppResult<Self> {
        if raw.is_empty() {
            return Err(AppError::InvalidNamespace(
                "namespace must not be empty".to_string(),
            ));
        }

        if raw.len() > MAX_NAMESPACE_LEN {
            return Err(AppError::InvalidNamespace(format!(
                "namespace is {} characters long, limit is {}",
                raw.len(),
                MAX_NAMESPACE_LEN
            )));
        }

        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
        {
            return Err(AppError::InvalidNamespace(format!(
                "namespace '{}' contains disallowed character {:?}",
                raw.escape_default(),
                bad
            )));
        }

        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the vector index covering this namespace.
    pub fn index_name(&self) -> String {
        format!("{}-embedding-idx", self.0)
    }

    /// Name of the KNN graph projection for this namespace.
    pub fn projection_name(&self) -> String {
        format!("{}-knn", self.0)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Namespace {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Namespace::parse(&value)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.0
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_allowed_characters() {
        let ns = Namespace::parse("acme_Workspace-01").unwrap();
        assert_eq!(ns.as_str(), "acme_Workspace-01");
        assert_eq!(ns.projection_name(), "acme_Workspace-01-knn");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            Namespace::parse(""),
            Err(AppError::InvalidNamespace(_))
        ));
    }

    #[test]
    fn test_rejects_injection_attempts() {
        for raw in ["acme`) DETACH DELETE n //", "a b", "ns;drop", "café", "x:Label"] {
            assert!(Namespace::parse(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_length_bound() {
        let ok = "a".repeat(MAX_NAMESPACE_LEN);
        let too_long = "a".repeat(MAX_NAMESPACE_LEN + 1);
        assert!(Namespace::parse(&ok).is_ok());
        assert!(Namespace::parse(&too_long).is_err());
    }

    #[test]
    fn test_serde_validates() {
        let ns: Namespace = serde_json::from_str("\"acme\"").unwrap();
        assert_eq!(ns.as_str(), "acme");
        assert!(serde_json::from_str::<Namespace>("\"bad name\"").is_err());
    }
}
