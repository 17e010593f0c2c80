//! # Transport Flows
//!
//! The forwarder's downstream publisher decides how envelopes reach
//! subscribers:
//!
//! | Transport | Subscriber entry point |
//! |-----------|------------------------|
//! | HTTP push queue | `Dispatcher::handle_push_body` |
//! | In-process pub/sub | `Subscription::recv` → `Dispatcher::handle_bytes` |

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use dp_01_forwarder::{ForwarderConfig, IterationOutcome, ReliableForwarder};
    use dp_02_subscriber::{
        CallableTarget, DispatchOutcome, Dispatcher, DropReason, Record, Registry,
        SubscriberConfig,
    };
    use dp_03_emitter::{BasicEmitter, EmitterConfig, MessageParams};
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;
    use shared_bus::{
        BroadcastBus, HttpPushPublisher, InMemoryListStore, ListPublisher, ListStore, TopicFilter,
    };
    use shared_crypto::{PipelineSecret, SymmetricEncryptor};
    use shared_types::{Envelope, EventType, TopicNaming};

    // =========================================================================
    // FIXTURES
    // =========================================================================

    const API_KEY: &str = "push-key";
    const TOPIC: &str = "shop-test-v1-orders";

    fn encryptor() -> Arc<SymmetricEncryptor> {
        Arc::new(
            SymmetricEncryptor::with_secret(PipelineSecret::new("transport secret"))
                .expect("secret")
                .with_api_key(API_KEY),
        )
    }

    /// Emit one CREATED order onto the "pipeline" list and return the envelope.
    async fn enqueue_order(store: &Arc<InMemoryListStore>) -> Envelope {
        let emitter = BasicEmitter::new(
            encryptor(),
            EmitterConfig {
                emission_disabled: false,
                naming: TopicNaming::new("shop-test"),
            },
        );
        let inbound = ListPublisher::namespaced(store.clone(), "pipeline");
        emitter
            .emit(
                &MessageParams::new(TOPIC, "Order_1_0", br#"{"id":"A-1"}"#.to_vec(), EventType::Created),
                &inbound,
            )
            .await
            .expect("emit")
            .expect("emission enabled")
    }

    fn order_dispatcher() -> Dispatcher<SymmetricEncryptor> {
        let target = CallableTarget::new("orders", |payload| {
            let id = payload.id().unwrap_or_default();
            Ok(Some(Record::new(id, serde_json::Map::new())))
        });
        let mut registry = Registry::new();
        registry.register("Order_1_0".parse::<shared_types::SchemaType>().expect("type"), target, None);
        Dispatcher::new(
            "orders-app",
            Arc::new(registry),
            encryptor(),
            SubscriberConfig::with_api_keys([API_KEY]),
        )
    }

    // =========================================================================
    // HTTP PUSH QUEUE
    // =========================================================================

    #[tokio::test]
    async fn test_forwarder_posts_to_push_queue_and_subscriber_handles_push() {
        let store = Arc::new(InMemoryListStore::new());
        let envelope = enqueue_order(&store).await;
        let encoded = STANDARD.encode(envelope.encode().expect("encode"));

        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("/queues/{TOPIC}/messages"))
                    .header("Authorization", "OAuth mq-token")
                    .json_body(json!({ "messages": [{ "body": encoded }] }));
                then.status(200).json_body(json!({ "ids": ["1"] }));
            })
            .await;

        let publisher = Arc::new(HttpPushPublisher::new(server.base_url(), "mq-token").expect("client"));
        let forwarder =
            ReliableForwarder::new(store.clone(), publisher, ForwarderConfig::for_testing("pipeline"));

        let outcome = forwarder.process_queue().await.expect("forward");
        assert!(matches!(outcome, IterationOutcome::Forwarded { ref topic, .. } if topic == TOPIC));
        mock.assert_async().await;
        assert_eq!(store.llen("pipeline_in_progress").await.expect("llen"), 0);

        // The queue service pushes the same base64 body to the subscriber.
        let pushed = json!({ "body": encoded }).to_string();
        let outcome = order_dispatcher()
            .handle_push_body(pushed.as_bytes())
            .await
            .expect("dispatch");
        assert_eq!(
            outcome,
            DispatchOutcome::Handled(Some(Record::new("A-1", serde_json::Map::new())))
        );
    }

    #[tokio::test]
    async fn test_rejected_push_puts_message_back() {
        let store = Arc::new(InMemoryListStore::new());
        enqueue_order(&store).await;

        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(503);
            })
            .await;

        let publisher = Arc::new(HttpPushPublisher::new(server.base_url(), "mq-token").expect("client"));
        let forwarder =
            ReliableForwarder::new(store.clone(), publisher, ForwarderConfig::for_testing("pipeline"));

        let outcome = forwarder.process_queue().await.expect("forward");
        assert!(matches!(outcome, IterationOutcome::Requeued { .. }));
        assert_eq!(store.llen("pipeline").await.expect("llen"), 1);
        assert_eq!(store.llen("pipeline_in_progress").await.expect("llen"), 0);
    }

    // =========================================================================
    // IN-PROCESS PUB/SUB
    // =========================================================================

    #[tokio::test]
    async fn test_pubsub_subscription_feeds_dispatcher() {
        let store = Arc::new(InMemoryListStore::new());
        enqueue_order(&store).await;

        let bus = Arc::new(BroadcastBus::new());
        let mut orders = bus.subscribe(TopicFilter::topics([TOPIC]));
        let mut other = bus.subscribe(TopicFilter::topics(["shop-test-v1-invoices"]));

        let forwarder =
            ReliableForwarder::new(store.clone(), bus.clone(), ForwarderConfig::for_testing("pipeline"));
        forwarder.process_queue().await.expect("forward");

        let message = orders.recv().await.expect("delivered");
        assert_eq!(message.topic, TOPIC);
        assert!(other.try_recv().expect("open").is_none());

        let outcome = order_dispatcher()
            .handle_bytes(&message.data)
            .await
            .expect("dispatch");
        assert!(matches!(outcome, DispatchOutcome::Handled(Some(_))));
    }

    #[tokio::test]
    async fn test_subscriber_with_other_key_rejects_delivery() {
        let store = Arc::new(InMemoryListStore::new());
        let envelope = enqueue_order(&store).await;

        let dispatcher = Dispatcher::new(
            "billing-app",
            Arc::new(Registry::new()),
            encryptor(),
            SubscriberConfig::with_api_keys(["billing-key"]),
        );
        let err = dispatcher.handle_envelope(&envelope).await.unwrap_err();
        assert!(err.is_auth());

        let open = Dispatcher::new(
            "billing-app",
            Arc::new(Registry::new()),
            encryptor(),
            SubscriberConfig::with_api_keys([API_KEY]),
        );
        assert_eq!(
            open.handle_envelope(&envelope).await.expect("dispatch"),
            DispatchOutcome::Dropped(DropReason::UnknownSchema("Order_1_0".to_string()))
        );
    }
}
