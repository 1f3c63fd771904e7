//! Domain types shared by the metrics services.
//!
//! Everything here is plain data: tenants are scoping keys, roles and
//! categories are closed vocabularies parsed from their lowercase names.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Identifies a tenant. Compared case-sensitively and exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Role carried in a credential.
///
/// Roles the service does not recognise still decode, as [`Role::Unknown`],
/// so that policy can deny them instead of the credential failing to parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Viewer,
    Manager,
    Admin,
    Unknown(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Viewer => "viewer",
            Self::Manager => "manager",
            Self::Admin => "admin",
            Self::Unknown(name) => name,
        }
    }

    pub const fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "viewer" => Self::Viewer,
            "manager" => Self::Manager,
            "admin" => Self::Admin,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Role::from(raw.as_str()))
    }
}

/// A named class of aggregated measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricCategory {
    Summary,
    Operational,
    Financial,
    Audit,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 4] = [
        Self::Summary,
        Self::Operational,
        Self::Financial,
        Self::Audit,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Operational => "operational",
            Self::Financial => "financial",
            Self::Audit => "audit",
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for MetricCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Value of a single metric; numeric in the common case.
pub type MetricValue = serde_json::Value;
