//! Models that publish versioned payloads.

use crate::domain::EmitError;
use serde_json::Value;
use shared_types::{PipelineVersion, TopicNaming};

/// An application model that renders itself as one payload per implemented
/// pipeline version.
pub trait Emittable: Send + Sync {
    /// Payload type base name; `Order` yields `Order_1_0`, `Order_2_0`, ...
    fn payload_base(&self) -> &str;

    /// Record table name used in topic names.
    fn table_name(&self) -> &str;

    /// Every version `to_pipeline` can render, in any order.
    fn implemented_versions(&self) -> Vec<PipelineVersion>;

    /// Render the payload for `version`.
    ///
    /// # Errors
    ///
    /// `EmitError::Render` if `version` is not implemented or the model
    /// cannot be rendered.
    fn to_pipeline(&self, version: PipelineVersion) -> Result<Value, EmitError>;

    /// Owning principal stamped on emitted envelopes.
    fn owner_info(&self) -> Option<String> {
        None
    }

    /// Versions to emit, ascending.
    ///
    /// The default `1_0` is dropped once any later `1_x` exists.
    fn pipeline_versions(&self) -> Vec<PipelineVersion> {
        let mut versions = self.implemented_versions();
        versions.sort_unstable();
        versions.dedup();

        let default = PipelineVersion::new(1, 0);
        if versions.iter().any(|v| v.major == 1 && *v > default) {
            versions.retain(|v| *v != default);
        }
        versions
    }

    /// Topic payloads of `version` are published to.
    fn topic_name(&self, naming: &TopicNaming, version: PipelineVersion) -> String {
        naming.topic_name(&version.to_string(), self.table_name())
    }

    /// Type info for payloads of `version`.
    fn type_info(&self, version: PipelineVersion) -> String {
        format!("{}_{}", self.payload_base(), version)
    }
}
