//! # Topic Naming
//!
//! Topics are split per schema major version so that breaking changes never
//! share a stream with older consumers:
//!
//! ```text
//! <prefix>-v<major>-<table>      e.g. "pipeline-production-v1-orders"
//! ```

use serde::{Deserialize, Serialize};

/// Default topic prefix.
pub const DEFAULT_TOPIC_PREFIX: &str = "pipeline";

/// Builds destination topic names from a version and a record table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicNaming {
    /// Prefix shared by all topics of a deployment.
    pub prefix: String,
}

impl TopicNaming {
    /// Create a naming scheme with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Topic name for `version` (`"1_1"` or bare `"1"`) of `table`.
    #[must_use]
    pub fn topic_name(&self, version: &str, table: &str) -> String {
        format!("{}-v{}-{}", self.prefix, Self::major_of(version), table)
    }

    /// Major component of a `"<major>_<minor>"` version string.
    ///
    /// A string without `_` is already a major version.
    #[must_use]
    pub fn major_of(version: &str) -> &str {
        version.split_once('_').map_or(version, |(major, _)| major)
    }
}

impl Default for TopicNaming {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_PREFIX)
    }
}

/// Split an envelope `type_info` into its payload class and version string.
///
/// `"DefaultEmitter_1_0"` becomes `("DefaultEmitter", "1_0")`. The split is
/// made at the first `_`, so class names must not contain underscores here;
/// use [`crate::SchemaType`] when they might.
#[must_use]
pub fn payload_class_and_version(type_info: &str) -> (&str, Option<&str>) {
    match type_info.split_once('_') {
        Some((class, version)) => (class, Some(version)),
        None => (type_info, None),
    }
}
