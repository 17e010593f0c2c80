//! Adapters for the subscriber's outbound ports.

pub mod crud_handler;
pub mod list_source;
pub mod logging_handler;
pub mod memory_store;

pub use crud_handler::CrudHandler;
pub use list_source::{ListMessageSource, DEFAULT_RESERVATION};
pub use logging_handler::LoggingHandler;
pub use memory_store::InMemoryRecordStore;
