//! Identity records
//!
//! A mummy record is the durable descriptor of a registered component:
//! never an in-memory reference, only enough information to relocate the
//! defining module in a future process and pull the named export back out.
//! Its canonical string form is the URN used as the content address in the
//! registry and as the tag identity in the serialized tree.

use crate::error::{ReanimationError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain marker in the URN form.
pub const URN_DOMAIN: &str = "arbor";

/// Durable identity descriptor for a registered component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MummyRecord {
    pub name: String,
    pub namespace: String,
    pub package_name: String,
    pub package_version: String,
    pub relative_file_path: String,
}

impl MummyRecord {
    pub fn new(
        name: impl Into<String>,
        package_name: impl Into<String>,
        package_version: impl Into<String>,
        relative_file_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            package_name: package_name.into(),
            package_version: package_version.into(),
            relative_file_path: relative_file_path.into(),
        }
    }

    /// Canonical URN:
    /// `urn:arbor:<packageName>:<packageVersion>:<namespace>:<relativeFilePath>:<name>`
    /// with fixed field order; empty fields are allowed.
    pub fn urn(&self) -> String {
        format!(
            "urn:{}:{}:{}:{}:{}:{}",
            URN_DOMAIN,
            self.package_name,
            self.package_version,
            self.namespace,
            self.relative_file_path,
            self.name
        )
    }

    pub fn parse_urn(urn: &str) -> Result<Self> {
        let malformed = || ReanimationError::MalformedUrn(urn.to_string());
        let mut parts = urn.splitn(7, ':');
        let protocol = parts.next().ok_or_else(malformed)?;
        let domain = parts.next().ok_or_else(malformed)?;
        if protocol != "urn" || domain != URN_DOMAIN {
            return Err(malformed());
        }
        let package_name = parts.next().ok_or_else(malformed)?;
        let package_version = parts.next().ok_or_else(malformed)?;
        let namespace = parts.next().ok_or_else(malformed)?;
        let relative_file_path = parts.next().ok_or_else(malformed)?;
        let name = parts.next().ok_or_else(malformed)?;
        Ok(Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            package_name: package_name.to_string(),
            package_version: package_version.to_string(),
            relative_file_path: relative_file_path.to_string(),
        })
    }

    /// Exact-match package identity, `name@version`.
    pub fn package_id(&self) -> String {
        format!("{}@{}", self.package_name, self.package_version)
    }

    /// URN fields are separator-delimited and carry no escaping, so no
    /// field may contain the separator itself.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("namespace", &self.namespace),
            ("package_name", &self.package_name),
            ("package_version", &self.package_version),
            ("relative_file_path", &self.relative_file_path),
        ] {
            if value.contains(':') {
                return Err(ReanimationError::InvalidRecordField {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for MummyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.urn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urn_roundtrip() {
        let record = MummyRecord::new("Server", "cloud-widgets", "1.2.0", "src/server.rs");
        let urn = record.urn();
        assert_eq!(
            urn,
            "urn:arbor:cloud-widgets:1.2.0::src/server.rs:Server"
        );
        assert_eq!(MummyRecord::parse_urn(&urn).unwrap(), record);
    }

    #[test]
    fn test_parse_rejects_foreign_urn() {
        assert!(MummyRecord::parse_urn("urn:other:p:1:ns:f:N").is_err());
        assert!(MummyRecord::parse_urn("not-a-urn").is_err());
        assert!(MummyRecord::parse_urn("urn:arbor:p:1").is_err());
    }

    #[test]
    fn test_validate_rejects_separator_in_fields() {
        let mut record = MummyRecord::new("Server", "pkg", "1.0.0", "src/lib.rs");
        record.name = "Ser:ver".into();
        assert!(record.validate().is_err());
    }
}
