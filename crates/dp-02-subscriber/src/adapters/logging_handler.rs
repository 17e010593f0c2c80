//! Handler that only logs what it receives.

use crate::domain::{HandlerError, Payload, Record, Target};
use crate::ports::PayloadHandler;
use async_trait::async_trait;
use shared_types::EventType;
use tracing::info;

/// Logs each payload and stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler;

#[async_trait]
impl PayloadHandler for LoggingHandler {
    async fn handle_payload(
        &self,
        payload: &Payload,
        target: &Target,
        event_type: EventType,
    ) -> Result<Option<Record>, HandlerError> {
        info!(
            type_info = %payload.schema,
            target_name = target.name().unwrap_or("-"),
            %event_type,
            body = %payload.body,
            "Pipeline payload received"
        );
        Ok(None)
    }
}
