//! # End-to-End Pipeline
//!
//! ```text
//! BasicEmitter ──ListPublisher──→ "pipeline" list
//!                                     │
//!                           ReliableForwarder
//!                                     │
//!                        ListPublisher (per topic)
//!                                     │
//!                       PullingSubscriber → Dispatcher → target
//! ```

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dp_01_forwarder::{ForwarderConfig, IterationOutcome, ReliableForwarder};
    use dp_02_subscriber::{
        CrudHandler, DispatchOutcome, Dispatcher, InMemoryRecordStore, ListMessageSource,
        PullingSubscriber, Registry, SubscriberConfig, TargetModel,
    };
    use dp_03_emitter::{BasicEmitter, Change, EmitError, Emittable, EmitterConfig, MessageParams};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use shared_bus::{InMemoryListStore, ListPublisher, ListStore, MemoryPublisher, Publisher};
    use shared_crypto::{PipelineSecret, SymmetricEncryptor};
    use shared_types::{EventType, PipelineVersion, SchemaType, TopicNaming};

    // =========================================================================
    // FIXTURES
    // =========================================================================

    const API_KEY: &str = "123XYZ";

    fn encryptor() -> Arc<SymmetricEncryptor> {
        Arc::new(
            SymmetricEncryptor::with_secret(PipelineSecret::new("pipeline secret"))
                .expect("secret")
                .with_api_key(API_KEY),
        )
    }

    fn emitter() -> BasicEmitter<SymmetricEncryptor> {
        BasicEmitter::new(
            encryptor(),
            EmitterConfig {
                emission_disabled: false,
                naming: TopicNaming::new("shop-test"),
            },
        )
    }

    fn schema(name: &str) -> SchemaType {
        name.parse().expect("schema type")
    }

    struct Order {
        id: u64,
        total: u64,
    }

    impl Emittable for Order {
        fn payload_base(&self) -> &str {
            "Order"
        }

        fn table_name(&self) -> &str {
            "orders"
        }

        fn implemented_versions(&self) -> Vec<PipelineVersion> {
            vec![PipelineVersion::new(1, 0), PipelineVersion::new(1, 1)]
        }

        fn to_pipeline(&self, version: PipelineVersion) -> Result<Value, EmitError> {
            Ok(match version.minor {
                0 => json!({"id": self.id}),
                _ => json!({"id": self.id, "total": self.total, "updated_at": 1_700_000_000}),
            })
        }
    }

    // =========================================================================
    // SCENARIOS
    // =========================================================================

    /// `Order_1_1` registered against a model that only knows `1_0` is
    /// handled by `from_pipeline_1_0` with the envelope's event type.
    #[tokio::test]
    async fn test_closest_lower_handler_receives_update() {
        let calls: Arc<Mutex<Vec<(Value, EventType)>>> = Arc::default();
        let sink = Arc::clone(&calls);
        let model = TargetModel::new("orders").with_method(
            PipelineVersion::new(1, 0),
            move |payload, event_type| {
                sink.lock().push((payload.body.clone(), event_type));
                Ok(None)
            },
        );
        let mut registry = Registry::new();
        registry.register(schema("Order_1_1"), model, None);
        let dispatcher = Dispatcher::new(
            "orders-app",
            Arc::new(registry),
            encryptor(),
            SubscriberConfig::with_api_keys([API_KEY]),
        );

        let envelope = emitter()
            .create_message(&MessageParams::new(
                "orders",
                "Order_1_1",
                br#"{"id":1,"total":5}"#.to_vec(),
                EventType::Updated,
            ))
            .expect("envelope");

        let outcome = dispatcher.handle_envelope(&envelope).await.expect("dispatch");

        assert_eq!(outcome, DispatchOutcome::Handled(None));
        assert_eq!(
            *calls.lock(),
            vec![(json!({"id": 1, "total": 5}), EventType::Updated)]
        );
    }

    /// A model change travels through the main queue, the forwarder and a
    /// topic list into the record store.
    #[tokio::test]
    async fn test_model_change_reaches_record_store() {
        let store = Arc::new(InMemoryListStore::new());
        let inbound = ListPublisher::namespaced(store.clone(), "pipeline");

        let envelopes = emitter()
            .emit_model(&Order { id: 9, total: 42 }, Change::Created, &inbound)
            .await
            .expect("emit");
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].topic, "shop-test-v1-orders");

        let downstream = Arc::new(ListPublisher::per_topic(store.clone()));
        let forwarder = ReliableForwarder::new(
            store.clone(),
            downstream,
            ForwarderConfig::for_testing("pipeline"),
        );
        let outcome = forwarder.process_queue().await.expect("forward");
        assert!(matches!(outcome, IterationOutcome::Forwarded { .. }));
        assert_eq!(store.llen("pipeline").await.expect("llen"), 0);
        assert_eq!(store.llen("pipeline_in_progress").await.expect("llen"), 0);

        let records = Arc::new(InMemoryRecordStore::new());
        let mut registry = Registry::new();
        registry.register(
            schema("Order_1_1"),
            TargetModel::new("orders"),
            Some(Arc::new(CrudHandler::new(records.clone()))),
        );
        let dispatcher = Dispatcher::new(
            "orders-app",
            Arc::new(registry),
            encryptor(),
            SubscriberConfig::with_api_keys([API_KEY]),
        );

        let source = Arc::new(ListMessageSource::new(store.clone(), "shop-test-v1-orders"));
        let acked = PullingSubscriber::new(source)
            .with_wait(Duration::from_millis(10))
            .dispatch_to(&dispatcher)
            .await
            .expect("subscription");

        assert_eq!(acked, 1);
        let record = records.get("orders", "9").expect("stored order");
        assert_eq!(record.get("total"), Some(&json!(42)));
        assert_eq!(
            record.get("updated_at"),
            Some(&json!("2023-11-14T22:13:20+00:00"))
        );
    }

    /// Failed publishes put the message back; the next attempt delivers it
    /// exactly once to the subscriber.
    #[tokio::test]
    async fn test_retry_after_failed_publish() {
        struct FlakyPublisher {
            failures_left: Mutex<u32>,
            inner: MemoryPublisher,
        }

        #[async_trait::async_trait]
        impl Publisher for FlakyPublisher {
            async fn publish(
                &self,
                topic: &str,
                data: &[u8],
            ) -> Result<(), shared_bus::PublishError> {
                {
                    let mut left = self.failures_left.lock();
                    if *left > 0 {
                        *left -= 1;
                        return Err(shared_bus::PublishError::Transport {
                            topic: topic.to_string(),
                            reason: "connection reset".to_string(),
                        });
                    }
                }
                self.inner.publish(topic, data).await
            }
        }

        let store = Arc::new(InMemoryListStore::new());
        let inbound = ListPublisher::namespaced(store.clone(), "pipeline");
        emitter()
            .emit(
                &MessageParams::new("orders", "Order_1_0", br#"{"id":1}"#.to_vec(), EventType::Created),
                &inbound,
            )
            .await
            .expect("emit");

        let publisher = Arc::new(FlakyPublisher {
            failures_left: Mutex::new(1),
            inner: MemoryPublisher::new(),
        });
        let forwarder = ReliableForwarder::new(
            store.clone(),
            publisher.clone(),
            ForwarderConfig::for_testing("pipeline"),
        );

        let first = forwarder.process_queue().await.expect("first attempt");
        assert!(matches!(first, IterationOutcome::Requeued { .. }));
        assert_eq!(store.llen("pipeline").await.expect("llen"), 1);

        let second = forwarder.process_queue().await.expect("second attempt");
        assert!(matches!(second, IterationOutcome::Forwarded { .. }));
        assert_eq!(publisher.inner.len(), 1);
        assert_eq!(forwarder.processed(), 1);
    }
}
