//! Non-error dispatch results.

use super::record::Record;
use std::fmt;

/// Why a message was dropped without being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// No registered schema is compatible with the envelope's type info.
    UnknownSchema(String),
    /// The payload type has no target, or its target is `Target::None`.
    Unclaimed(String),
    /// The target model has no method for this major version at or below
    /// the received minor.
    NoHandlerMethod(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSchema(t) => write!(f, "unknown message {t}"),
            Self::Unclaimed(t) => write!(f, "unclaimed message {t}"),
            Self::NoHandlerMethod(t) => write!(f, "no handler method for {t}"),
        }
    }
}

/// What happened to one envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A handler, model method or callable ran; carries its record, if any.
    Handled(Option<Record>),
    /// Nothing was registered to handle it.
    Dropped(DropReason),
    /// Processing is disabled.
    Skipped,
}

impl DispatchOutcome {
    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Handled(_) => "handled",
            Self::Dropped(_) => "dropped",
            Self::Skipped => "skipped",
        }
    }
}
