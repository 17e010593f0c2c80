//! Domain types for the subscriber.

pub mod config;
pub mod errors;
pub mod outcome;
pub mod payload;
pub mod record;
pub mod resolution;
pub mod schema;
pub mod target;

pub use config::SubscriberConfig;
pub use errors::{DispatchError, HandlerError, ParseError};
pub use outcome::{DispatchOutcome, DropReason};
pub use payload::Payload;
pub use record::Record;
pub use resolution::{most_suitable_handler_method, most_suitable_handler_method_name};
pub use schema::{ParseFn, Schema};
pub use target::{
    handler_method_name, CallableFn, CallableTarget, PipelineFn, Target, TargetModel,
};
