//! Dispatch targets.
//!
//! A target is what a payload type is delivered to once no handler is
//! registered for it: either a model exposing one conversion method per
//! pipeline version, or a plain callable.

use super::errors::HandlerError;
use super::payload::Payload;
use super::record::Record;
use shared_types::{EventType, PipelineVersion};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

fn next_model_id() -> u64 {
    NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed)
}

/// A version-specific conversion method, `from_pipeline_<major>_<minor>`.
pub type PipelineFn =
    Arc<dyn Fn(&Payload, EventType) -> Result<Option<Record>, HandlerError> + Send + Sync>;

/// A plain callable target; receives only the payload.
pub type CallableFn = Arc<dyn Fn(&Payload) -> Result<Option<Record>, HandlerError> + Send + Sync>;

/// Name of the conversion method for `version`.
pub fn handler_method_name(version: PipelineVersion) -> String {
    format!("from_pipeline_{version}")
}

/// A model with conversion methods keyed by the version they accept.
#[derive(Clone)]
pub struct TargetModel {
    id: u64,
    name: String,
    methods: BTreeMap<PipelineVersion, PipelineFn>,
}

impl TargetModel {
    /// A model with no methods yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: next_model_id(),
            name: name.into(),
            methods: BTreeMap::new(),
        }
    }

    /// Add the `from_pipeline_<version>` method.
    #[must_use]
    pub fn with_method<F>(mut self, version: PipelineVersion, method: F) -> Self
    where
        F: Fn(&Payload, EventType) -> Result<Option<Record>, HandlerError> + Send + Sync + 'static,
    {
        self.methods.insert(version, Arc::new(method));
        self.id = next_model_id();
        self
    }

    /// Process-unique identity of this method table.
    ///
    /// Names are free-form and may repeat; the id changes whenever a method
    /// is added, so two models share an id only if they share their methods.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The method registered for exactly `version`.
    pub fn method(&self, version: PipelineVersion) -> Option<&PipelineFn> {
        self.methods.get(&version)
    }

    /// All conversion methods in version order.
    pub fn methods(&self) -> &BTreeMap<PipelineVersion, PipelineFn> {
        &self.methods
    }
}

impl fmt::Debug for TargetModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetModel")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A named callable target.
#[derive(Clone)]
pub struct CallableTarget {
    name: String,
    call: CallableFn,
}

impl CallableTarget {
    /// Wrap `call` under `name`.
    pub fn new<F>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(&Payload) -> Result<Option<Record>, HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            call: Arc::new(call),
        }
    }

    /// Callable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the callable.
    pub fn call(&self, payload: &Payload) -> Result<Option<Record>, HandlerError> {
        (self.call)(payload)
    }
}

impl fmt::Debug for CallableTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableTarget").field("name", &self.name).finish()
    }
}

/// What a payload type is registered against.
#[derive(Debug, Clone)]
pub enum Target {
    /// A model with per-version conversion methods.
    Model(Arc<TargetModel>),
    /// A plain callable.
    Callable(Arc<CallableTarget>),
    /// Known type, deliberately unclaimed.
    None,
}

impl Target {
    /// Target name for logs, `None` for an unclaimed type.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Model(model) => Some(model.name()),
            Self::Callable(callable) => Some(callable.name()),
            Self::None => None,
        }
    }

    /// True unless this is `Target::None`.
    pub fn is_claimed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl From<TargetModel> for Target {
    fn from(model: TargetModel) -> Self {
        Self::Model(Arc::new(model))
    }
}

impl From<CallableTarget> for Target {
    fn from(callable: CallableTarget) -> Self {
        Self::Callable(Arc::new(callable))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_name() {
        assert_eq!(
            handler_method_name(PipelineVersion::new(1, 0)),
            "from_pipeline_1_0"
        );
        assert_eq!(
            handler_method_name(PipelineVersion::new(2, 13)),
            "from_pipeline_2_13"
        );
    }

    #[test]
    fn test_target_names() {
        let model: Target = TargetModel::new("Order").into();
        let callable: Target = CallableTarget::new("audit", |_| Ok(None)).into();
        assert_eq!(model.name(), Some("Order"));
        assert_eq!(callable.name(), Some("audit"));
        assert_eq!(Target::None.name(), None);
        assert!(!Target::None.is_claimed());
    }
}
