//! # Subscriber Dispatcher
//!
//! Turns received envelopes into calls on registered targets.
//!
//! ## Steps
//!
//! | Step | Failure |
//! |------|---------|
//! | Processing switch | `Skipped` |
//! | API key present and accepted | `NoApiKey` / `WrongApiKey` |
//! | Decrypt | `Decryption` |
//! | Resolve schema: exact type, else first registered type with the same major | `Dropped(UnknownSchema)` |
//! | Parse | `Parse` |
//! | Target for the parsed type | `Dropped(Unclaimed)` |
//! | Handler, else `from_pipeline_<major>_<n>` with greatest `n <= minor`, else callable | `Dropped(NoHandlerMethod)` |
//!
//! Handler failures other than not-found are logged and the message counts
//! as handled, so one bad record never stalls a stream.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut registry = Registry::new();
//! registry.register(
//!     "Order_1_1".parse::<SchemaType>()?,
//!     TargetModel::new("orders").with_method(PipelineVersion::new(1, 0), |payload, event| {
//!         Ok(None)
//!     }),
//!     None,
//! );
//! let dispatcher = Dispatcher::new("orders-app", Arc::new(registry), encryptor, config);
//! dispatcher.handle_envelope(&envelope).await?;
//! ```
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service/     - Dispatcher, PullingSubscriber                   │
//! │  registry.rs  - Registry (payload type -> target, handler)      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  adapters/    - LoggingHandler, CrudHandler, InMemoryRecordStore│
//! │                 ListMessageSource                               │
//! │  ports/       - PayloadHandler, RecordStore, MessageSource      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  domain/      - Target, Schema, Payload, resolution, errors     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod registry;
pub mod service;

pub use adapters::{
    CrudHandler, InMemoryRecordStore, ListMessageSource, LoggingHandler, DEFAULT_RESERVATION,
};
pub use domain::*;
pub use ports::{MessageSource, PayloadHandler, PulledMessage, RecordStore};
pub use registry::{Registration, Registry};
pub use service::{Dispatcher, PullingSubscriber, DEFAULT_PULL_WAIT};
