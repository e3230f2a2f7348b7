//! Error types for the ddbstream conversion and dispatch pipeline.

use thiserror::Error;
use uuid::Uuid;

use crate::event::EventType;

/// Boxed error returned by event handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can terminate processing of a record batch.
///
/// Every variant is fail-fast: the first one raised stops the batch and is
/// returned to the caller of [`Processor::process`](crate::Processor::process).
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("invalid key format: {key:?} (expected `<source>#<uuid>`)")]
    InvalidKeyFormat { key: String },

    #[error("identifier is not a UUID: {value:?}")]
    MalformedIdentifier {
        value: String,
        #[source]
        source: uuid::Error,
    },

    #[error("record is missing string key attribute '{attribute}'")]
    MissingKeyAttribute { attribute: String },

    #[error("unsupported stream operation '{operation}'")]
    UnknownOperation { operation: String },

    #[error("handler failed for {namespace}/{event_type} (id {id}): {source}")]
    HandlerFailure {
        namespace: String,
        event_type: EventType,
        id: Uuid,
        #[source]
        source: BoxError,
    },
}

impl StreamError {
    /// Returns `true` if the error came from decoding a record's keys.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKeyFormat { .. }
                | Self::MalformedIdentifier { .. }
                | Self::MissingKeyAttribute { .. }
        )
    }

    /// Returns `true` if a registered handler reported the failure.
    pub fn is_handler_failure(&self) -> bool {
        matches!(self, Self::HandlerFailure { .. })
    }
}
