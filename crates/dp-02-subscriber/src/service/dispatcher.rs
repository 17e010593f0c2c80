//! # Subscriber Dispatcher
//!
//! ```text
//!  envelope ─→ disabled? ──yes──→ Skipped
//!                 │
//!          verify API key ──fail──→ Err(NoApiKey | WrongApiKey)
//!                 │
//!              decrypt ──fail──→ Err(Decryption)
//!                 │
//!        resolve schema (exact, then same major) ──none──→ Dropped
//!                 │
//!               parse ──fail──→ Err(Parse)
//!                 │
//!          target for the parsed type ──none──→ Dropped
//!                 │
//!   handler? → handle_payload
//!   model?   → from_pipeline_<major>_<n>, greatest n <= minor
//!   callable → call(payload)
//! ```

use crate::domain::{
    handler_method_name, most_suitable_handler_method, DispatchError, DispatchOutcome, DropReason,
    HandlerError, Payload, PipelineFn, Record, SubscriberConfig, Target, TargetModel,
};
use crate::registry::Registry;
use parking_lot::RwLock;
use pipeline_telemetry::{metric_inc, SUBSCRIBER_ENVELOPES};
use shared_bus::decode_push_body;
use shared_crypto::Encryptor;
use shared_types::{Envelope, EventType, PipelineVersion};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// (target model id, received version) -> version of the method to call.
type MethodCache = Arc<RwLock<HashMap<(u64, PipelineVersion), Option<PipelineVersion>>>>;

/// Authenticates, decrypts and routes envelopes to registered targets.
///
/// Clones share the registry and the method cache. Dispatchers built
/// separately with [`Dispatcher::new`] have separate caches, even over the
/// same registry.
pub struct Dispatcher<E: Encryptor + ?Sized> {
    identity: String,
    registry: Arc<Registry>,
    encryptor: Arc<E>,
    config: SubscriberConfig,
    method_cache: MethodCache,
}

impl<E: Encryptor + ?Sized> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            registry: Arc::clone(&self.registry),
            encryptor: Arc::clone(&self.encryptor),
            config: self.config.clone(),
            method_cache: Arc::clone(&self.method_cache),
        }
    }
}

impl<E: Encryptor + ?Sized> Dispatcher<E> {
    /// Create a dispatcher named `identity` with an empty method cache.
    pub fn new(
        identity: impl Into<String>,
        registry: Arc<Registry>,
        encryptor: Arc<E>,
        config: SubscriberConfig,
    ) -> Self {
        Self {
            identity: identity.into(),
            registry,
            encryptor,
            config,
            method_cache: Arc::default(),
        }
    }

    /// Name used in logs.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The registration table.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of cached method resolutions.
    pub fn cached_methods(&self) -> usize {
        self.method_cache.read().len()
    }

    /// Decode a binary envelope and dispatch it.
    pub async fn handle_bytes(&self, bytes: &[u8]) -> Result<DispatchOutcome, DispatchError> {
        let envelope = match Envelope::decode(bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                metric_inc!(SUBSCRIBER_ENVELOPES, &["rejected"]);
                return Err(e.into());
            }
        };
        self.handle_envelope(&envelope).await
    }

    /// Decode a push-queue request body and dispatch the envelope in it.
    pub async fn handle_push_body(&self, body: &[u8]) -> Result<DispatchOutcome, DispatchError> {
        let bytes = match decode_push_body(body) {
            Ok(bytes) => bytes,
            Err(e) => {
                metric_inc!(SUBSCRIBER_ENVELOPES, &["rejected"]);
                return Err(e.into());
            }
        };
        self.handle_bytes(&bytes).await
    }

    /// Authenticate, decrypt, parse and dispatch one envelope.
    ///
    /// # Errors
    ///
    /// API-key, decryption and parse failures, and handler `NotFound`.
    /// Unknown or unclaimed types are `Ok(DispatchOutcome::Dropped(..))`.
    pub async fn handle_envelope(
        &self,
        envelope: &Envelope,
    ) -> Result<DispatchOutcome, DispatchError> {
        let result = self.dispatch_envelope(envelope).await;
        let label = match &result {
            Ok(outcome) => outcome.label(),
            Err(_) => "rejected",
        };
        metric_inc!(SUBSCRIBER_ENVELOPES, &[label]);
        result
    }

    async fn dispatch_envelope(
        &self,
        envelope: &Envelope,
    ) -> Result<DispatchOutcome, DispatchError> {
        if self.config.processing_disabled {
            debug!(uuid = %envelope.uuid, "Skipping incoming pipeline message (processing disabled)");
            return Ok(DispatchOutcome::Skipped);
        }

        self.verify_api_key(envelope)?;
        let plaintext = self.encryptor.decrypt(envelope)?;

        let Some(schema) = self.registry.resolve_schema(&envelope.type_info) else {
            info!(
                subscriber = %self.identity,
                uuid = %envelope.uuid,
                type_info = %envelope.type_info,
                "Dropping unknown message"
            );
            return Ok(DispatchOutcome::Dropped(DropReason::UnknownSchema(
                envelope.type_info.clone(),
            )));
        };

        let payload = schema.parse(&plaintext).map_err(|e| DispatchError::Parse {
            type_info: envelope.type_info.clone(),
            reason: e.to_string(),
        })?;

        self.handle_payload(&payload, envelope.event_type).await
    }

    /// Deliver an already parsed payload to its target.
    pub async fn handle_payload(
        &self,
        payload: &Payload,
        event_type: EventType,
    ) -> Result<DispatchOutcome, DispatchError> {
        let schema = &payload.schema;
        let result = match (
            self.registry.target_for(schema),
            self.registry.handler_for(schema),
        ) {
            (None | Some(Target::None), _) => {
                info!(subscriber = %self.identity, type_info = %schema, "Dropping unclaimed message");
                return Ok(DispatchOutcome::Dropped(DropReason::Unclaimed(
                    schema.to_string(),
                )));
            }
            (Some(target), Some(handler)) => {
                handler.handle_payload(payload, target, event_type).await
            }
            (Some(Target::Model(model)), None) => match self.handler_method(schema.version(), model) {
                Some(method) => method(payload, event_type),
                None => {
                    info!(
                        subscriber = %self.identity,
                        type_info = %schema,
                        target_name = model.name(),
                        "No handler set, dropping message"
                    );
                    return Ok(DispatchOutcome::Dropped(DropReason::NoHandlerMethod(
                        schema.to_string(),
                    )));
                }
            },
            (Some(Target::Callable(callable)), None) => callable.call(payload),
        };

        self.handled(payload, result)
    }

    /// Check the envelope's API key against the accepted set.
    pub fn verify_api_key(&self, envelope: &Envelope) -> Result<(), DispatchError> {
        let key = envelope.api_key.trim();
        if key.is_empty() {
            warn!(uuid = %envelope.uuid, "Rejecting envelope without API key");
            return Err(DispatchError::NoApiKey);
        }
        if !self.config.accepts(key) {
            warn!(uuid = %envelope.uuid, "Rejecting envelope with unknown API key");
            return Err(DispatchError::WrongApiKey);
        }
        Ok(())
    }

    /// Name of the method `model` would handle `version` with, using the
    /// cache.
    pub fn most_suitable_handler_method_name(
        &self,
        version: PipelineVersion,
        model: &TargetModel,
    ) -> Option<String> {
        self.resolve_method_version(version, model)
            .map(handler_method_name)
    }

    fn handler_method(&self, version: PipelineVersion, model: &TargetModel) -> Option<PipelineFn> {
        let method_version = self.resolve_method_version(version, model)?;
        model.method(method_version).cloned()
    }

    fn resolve_method_version(
        &self,
        version: PipelineVersion,
        model: &TargetModel,
    ) -> Option<PipelineVersion> {
        let key = (model.id(), version);
        if let Some(cached) = self.method_cache.read().get(&key) {
            return *cached;
        }

        let resolved = most_suitable_handler_method(version, model).map(|(v, _)| v);
        debug!(
            subscriber = %self.identity,
            target_name = model.name(),
            %version,
            method = ?resolved.map(handler_method_name),
            "Resolved handler method"
        );
        self.method_cache.write().insert(key, resolved);
        resolved
    }

    fn handled(
        &self,
        payload: &Payload,
        result: Result<Option<Record>, HandlerError>,
    ) -> Result<DispatchOutcome, DispatchError> {
        match result {
            Ok(record) => Ok(DispatchOutcome::Handled(record)),
            Err(e) if e.propagates() => Err(e.into()),
            Err(e) => {
                error!(
                    subscriber = %self.identity,
                    type_info = %payload.schema,
                    error = %e,
                    "Handler failed; message discarded"
                );
                Ok(DispatchOutcome::Handled(None))
            }
        }
    }
}
