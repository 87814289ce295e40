//! Versioned cache store identification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Logical role of a versioned store.
///
/// Exactly one store per role is current at any time; every other version
/// of the same role is stale and eligible for deletion at activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheRole {
    /// Precached application shell assets.
    Static,
    /// Responses captured while serving live traffic.
    Runtime,
}

impl CacheRole {
    /// Get the role name used inside version tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for CacheRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CacheRole {
    type Err = VersionTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Self::Static),
            "runtime" => Ok(Self::Runtime),
            other => Err(VersionTagError::UnknownRole(other.to_string())),
        }
    }
}

/// Errors from parsing a version tag.
#[derive(Debug, Clone, thiserror::Error)]
pub enum VersionTagError {
    #[error("malformed version tag: {0}")]
    Malformed(String),

    #[error("unknown cache role: {0}")]
    UnknownRole(String),
}

/// Tag identifying one generation of a named store.
///
/// Rendered as `{namespace}-{role}-v{version}`, e.g. `ms360-static-v11`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionTag {
    namespace: String,
    role: CacheRole,
    version: u32,
}

impl VersionTag {
    /// Create a new version tag.
    pub fn new(namespace: impl Into<String>, role: CacheRole, version: u32) -> Self {
        Self {
            namespace: namespace.into(),
            role,
            version,
        }
    }

    /// The deployment namespace this tag belongs to.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The store role this tag names.
    pub fn role(&self) -> CacheRole {
        self.role
    }

    /// The generation number.
    pub fn version(&self) -> u32 {
        self.version
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-v{}", self.namespace, self.role, self.version)
    }
}

impl FromStr for VersionTag {
    type Err = VersionTagError;

    /// Parse `{namespace}-{role}-v{version}`.
    ///
    /// The namespace may itself contain `-`, so the tag is consumed from the
    /// right.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || VersionTagError::Malformed(s.to_string());

        let (rest, version) = s.rsplit_once("-v").ok_or_else(malformed)?;
        let version: u32 = version.parse().map_err(|_| malformed())?;

        let (namespace, role) = rest.rsplit_once('-').ok_or_else(malformed)?;
        if namespace.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            namespace: namespace.to_string(),
            role: role.parse()?,
            version,
        })
    }
}
