//! # Emitter Service
//!
//! Encrypts payloads into envelopes and hands their binary form to a
//! `Publisher`.

use crate::domain::{Change, EmitError, EmitterConfig, MessageParams};
use crate::ports::Emittable;
use pipeline_telemetry::{metric_inc, EMITTER_MESSAGES_EMITTED};
use shared_bus::Publisher;
use shared_crypto::Encryptor;
use shared_types::{Envelope, EventType};
use std::sync::Arc;
use tracing::{debug, error};

/// Builds and publishes envelopes.
pub struct BasicEmitter<E: Encryptor + ?Sized> {
    encryptor: Arc<E>,
    config: EmitterConfig,
}

impl<E: Encryptor + ?Sized> BasicEmitter<E> {
    /// Emitter encrypting with `encryptor`.
    pub fn new(encryptor: Arc<E>, config: EmitterConfig) -> Self {
        Self { encryptor, config }
    }

    /// The active configuration.
    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Encrypt `params` into an envelope without publishing it.
    pub fn create_message(&self, params: &MessageParams) -> Result<Envelope, EmitError> {
        debug!(topic = %params.topic, type_info = %params.type_info, "Emitting to topic");
        Ok(self
            .encryptor
            .encrypt(&params.payload, &params.encrypt_options())?)
    }

    /// Encrypt `params` and publish the envelope to its topic.
    ///
    /// Returns `Ok(None)` without publishing when emission is disabled.
    ///
    /// # Errors
    ///
    /// Encryption, encoding and publish failures are logged and returned.
    pub async fn emit<P>(
        &self,
        params: &MessageParams,
        publisher: &P,
    ) -> Result<Option<Envelope>, EmitError>
    where
        P: Publisher + ?Sized,
    {
        if self.config.emission_disabled {
            debug!("Skipping outgoing pipeline message (emission disabled)");
            return Ok(None);
        }

        match self.publish_message(params, publisher).await {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                error!(topic = %params.topic, type_info = %params.type_info, error = %e, "Error during emit");
                Err(e)
            }
        }
    }

    /// Publish one envelope per pipeline version of `model`.
    ///
    /// Returns the envelopes in version order; empty when emission is
    /// disabled. Stops at the first failure.
    pub async fn emit_model<M, P>(
        &self,
        model: &M,
        change: Change,
        publisher: &P,
    ) -> Result<Vec<Envelope>, EmitError>
    where
        M: Emittable + ?Sized,
        P: Publisher + ?Sized,
    {
        if self.config.emission_disabled {
            debug!("Skipping outgoing pipeline messages (emission disabled)");
            return Ok(Vec::new());
        }

        let event_type = EventType::from(change);
        let mut envelopes = Vec::new();
        for version in model.pipeline_versions() {
            let params = self.model_params(model, version, event_type)?;
            match self.publish_message(&params, publisher).await {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => {
                    error!(
                        topic = %params.topic,
                        type_info = %params.type_info,
                        error = %e,
                        "Error during emit"
                    );
                    return Err(e);
                }
            }
        }
        Ok(envelopes)
    }

    fn model_params<M: Emittable + ?Sized>(
        &self,
        model: &M,
        version: shared_types::PipelineVersion,
        event_type: EventType,
    ) -> Result<MessageParams, EmitError> {
        let type_info = model.type_info(version);
        let body = model.to_pipeline(version)?;
        let payload = serde_json::to_vec(&body).map_err(|e| EmitError::Render {
            type_info: type_info.clone(),
            reason: e.to_string(),
        })?;

        let params = MessageParams::new(
            model.topic_name(&self.config.naming, version),
            type_info,
            payload,
            event_type,
        );
        Ok(match model.owner_info() {
            Some(owner) => params.with_owner(owner),
            None => params,
        })
    }

    async fn publish_message<P>(
        &self,
        params: &MessageParams,
        publisher: &P,
    ) -> Result<Envelope, EmitError>
    where
        P: Publisher + ?Sized,
    {
        let envelope = self.create_message(params)?;
        publisher.publish(&envelope.topic, &envelope.encode()?).await?;
        let event_type = envelope.event_type.to_string();
        metric_inc!(EMITTER_MESSAGES_EMITTED, &[event_type.as_str()]);
        Ok(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use shared_bus::{MemoryPublisher, PublishError};
    use shared_crypto::{PipelineSecret, SymmetricEncryptor};
    use shared_types::{PipelineVersion, TopicNaming};

    fn encryptor() -> Arc<SymmetricEncryptor> {
        Arc::new(
            SymmetricEncryptor::with_secret(PipelineSecret::new("s3cr3t"))
                .unwrap()
                .with_api_key("123XYZ"),
        )
    }

    fn emitter(config: EmitterConfig) -> BasicEmitter<SymmetricEncryptor> {
        BasicEmitter::new(encryptor(), config)
    }

    fn config() -> EmitterConfig {
        EmitterConfig {
            emission_disabled: false,
            naming: TopicNaming::new("shop-test"),
        }
    }

    struct TestEmitter {
        foo: String,
        versions: Vec<PipelineVersion>,
    }

    impl Emittable for TestEmitter {
        fn payload_base(&self) -> &str {
            "TestEmitter"
        }

        fn table_name(&self) -> &str {
            "test_emitters"
        }

        fn implemented_versions(&self) -> Vec<PipelineVersion> {
            self.versions.clone()
        }

        fn to_pipeline(&self, version: PipelineVersion) -> Result<Value, EmitError> {
            match (version.major, version.minor) {
                (1, 0) => Ok(json!({"foo": self.foo})),
                (1, 1) => Ok(json!({"foo": self.foo, "extra": "hi"})),
                (2, 0) => Ok(json!({"foo": self.foo, "version": 2})),
                _ => Err(EmitError::Render {
                    type_info: self.type_info(version),
                    reason: "not implemented".to_string(),
                }),
            }
        }

        fn owner_info(&self) -> Option<String> {
            Some("owner-1".to_string())
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl Publisher for FailingPublisher {
        async fn publish(&self, topic: &str, _data: &[u8]) -> Result<(), PublishError> {
            Err(PublishError::Transport {
                topic: topic.to_string(),
                reason: "down".to_string(),
            })
        }
    }

    #[test]
    fn test_create_message() {
        let params = MessageParams::new("orders", "Order_1_1", b"{\"id\":1}".to_vec(), EventType::Updated);
        let envelope = emitter(config()).create_message(&params).unwrap();

        assert_eq!(envelope.topic, "orders");
        assert_eq!(envelope.type_info, "Order_1_1");
        assert_eq!(envelope.event_type, EventType::Updated);
        assert_eq!(envelope.api_key, "123XYZ");
        assert_eq!(encryptor().decrypt(&envelope).unwrap(), b"{\"id\":1}");
    }

    #[tokio::test]
    async fn test_emit_publishes_encoded_envelope() {
        let publisher = MemoryPublisher::new();
        let params = MessageParams::new("orders", "Order_1_0", b"{}".to_vec(), EventType::Created);

        let envelope = emitter(config())
            .emit(&params, &publisher)
            .await
            .unwrap()
            .unwrap();

        let published = publisher.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "orders");
        assert_eq!(Envelope::decode(&published[0].1).unwrap(), envelope);
    }

    #[tokio::test]
    async fn test_emit_disabled() {
        let publisher = MemoryPublisher::new();
        let params = MessageParams::new("orders", "Order_1_0", b"{}".to_vec(), EventType::Created);
        let disabled = EmitterConfig {
            emission_disabled: true,
            ..config()
        };

        assert!(emitter(disabled).emit(&params, &publisher).await.unwrap().is_none());
        assert!(publisher.is_empty());
    }

    #[tokio::test]
    async fn test_emit_propagates_publish_failure() {
        let params = MessageParams::new("orders", "Order_1_0", b"{}".to_vec(), EventType::Created);
        let result = emitter(config()).emit(&params, &FailingPublisher).await;
        assert!(matches!(result, Err(EmitError::Publish(_))));
    }

    #[tokio::test]
    async fn test_emit_model_default_version() {
        let publisher = MemoryPublisher::new();
        let model = TestEmitter {
            foo: "baz".to_string(),
            versions: vec![PipelineVersion::new(1, 0)],
        };

        let envelopes = emitter(config())
            .emit_model(&model, Change::Created, &publisher)
            .await
            .unwrap();

        assert_eq!(envelopes.len(), 1);
        assert_eq!(publisher.published()[0].0, "shop-test-v1-test_emitters");
        let body: Value =
            serde_json::from_slice(&encryptor().decrypt(&envelopes[0]).unwrap()).unwrap();
        assert_eq!(body, json!({"foo": "baz"}));
        assert_eq!(envelopes[0].owner_info.as_deref(), Some("owner-1"));
    }

    #[tokio::test]
    async fn test_emit_model_multiple_versions() {
        let publisher = MemoryPublisher::new();
        let model = TestEmitter {
            foo: "bar".to_string(),
            versions: vec![
                PipelineVersion::new(1, 0),
                PipelineVersion::new(2, 0),
                PipelineVersion::new(1, 1),
            ],
        };

        let envelopes = emitter(config())
            .emit_model(&model, Change::Destroyed, &publisher)
            .await
            .unwrap();

        let type_infos: Vec<_> = envelopes.iter().map(|e| e.type_info.as_str()).collect();
        assert_eq!(type_infos, vec!["TestEmitter_1_1", "TestEmitter_2_0"]);
        assert!(envelopes.iter().all(|e| e.event_type == EventType::Deleted));

        let topics: Vec<_> = publisher.published().into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            topics,
            vec!["shop-test-v1-test_emitters", "shop-test-v2-test_emitters"]
        );
    }

    #[tokio::test]
    async fn test_emit_model_render_failure() {
        let publisher = MemoryPublisher::new();
        let model = TestEmitter {
            foo: "bar".to_string(),
            versions: vec![PipelineVersion::new(3, 0)],
        };
        let result = emitter(config())
            .emit_model(&model, Change::Updated, &publisher)
            .await;
        assert!(matches!(result, Err(EmitError::Render { .. })));
        assert!(publisher.is_empty());
    }
}
