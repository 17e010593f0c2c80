//! # Pipeline Versions
//!
//! A payload schema is identified by a base name plus a two-part version,
//! written `<Base>_<major>_<minor>` (e.g. `Order_1_1`).
//!
//! - A **major** bump is breaking: topics are split per major version.
//! - A **minor** bump is additive: a subscriber may handle a newer or older
//!   minor with the closest handler that does not exceed it.

use crate::errors::VersionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A comparable `(major, minor)` version.
///
/// Ordering compares `major` first, then `minor`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct PipelineVersion {
    /// Breaking-change component.
    pub major: u32,
    /// Additive-change component.
    pub minor: u32,
}

impl PipelineVersion {
    /// Create a version from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Returns true if both versions belong to the same major line.
    #[must_use]
    pub fn same_major(&self, other: &Self) -> bool {
        self.major == other.major
    }
}

impl fmt::Display for PipelineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.major, self.minor)
    }
}

impl FromStr for PipelineVersion {
    type Err = VersionError;

    /// Parse a `"<major>_<minor>"` string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::InvalidVersion(s.to_string());
        let (major, minor) = s.split_once('_').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// A fully-qualified payload schema type, e.g. `Order_1_1`.
///
/// The version is taken from the last two `_`-separated components so that
/// base names may themselves contain underscores (`Line_Item_2_0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaType {
    base: String,
    version: PipelineVersion,
}

impl SchemaType {
    /// Create a schema type from a base name and a version.
    pub fn new(base: impl Into<String>, version: PipelineVersion) -> Self {
        Self {
            base: base.into(),
            version,
        }
    }

    /// The schema base name (`Order` for `Order_1_1`).
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The schema version (`1_1` for `Order_1_1`).
    #[must_use]
    pub fn version(&self) -> PipelineVersion {
        self.version
    }

    /// Returns true if `other` has the same base name and major version.
    #[must_use]
    pub fn is_compatible_with(&self, other: &SchemaType) -> bool {
        self.base == other.base && self.version.same_major(&other.version)
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.version)
    }
}

impl FromStr for SchemaType {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || VersionError::InvalidSchemaType(s.to_string());
        let mut parts = s.rsplitn(3, '_');
        let minor = parts.next().ok_or_else(invalid)?;
        let major = parts.next().ok_or_else(invalid)?;
        let base = parts.next().filter(|b| !b.is_empty()).ok_or_else(invalid)?;

        Ok(Self {
            base: base.to_string(),
            version: PipelineVersion {
                major: major.parse().map_err(|_| invalid())?,
                minor: minor.parse().map_err(|_| invalid())?,
            },
        })
    }
}
