//! Version resolution for model targets.
//!
//! A message of version `M_m` is handled by `from_pipeline_M_n` with the
//! greatest `n <= m`. A newer minor than the message is never chosen and
//! another major never matches.

use super::target::{handler_method_name, PipelineFn, TargetModel};
use shared_types::PipelineVersion;

/// The method of `model` best suited to `version`, with the version it was
/// registered under.
pub fn most_suitable_handler_method(
    version: PipelineVersion,
    model: &TargetModel,
) -> Option<(PipelineVersion, &PipelineFn)> {
    model
        .methods()
        .range(PipelineVersion::new(version.major, 0)..=version)
        .next_back()
        .map(|(v, method)| (*v, method))
}

/// Name of the method [`most_suitable_handler_method`] picks.
pub fn most_suitable_handler_method_name(
    version: PipelineVersion,
    model: &TargetModel,
) -> Option<String> {
    most_suitable_handler_method(version, model).map(|(v, _)| handler_method_name(v))
}
