//! ddbstream-core: turns key-value change-stream records into typed domain
//! events and dispatches them to registered handlers.
//!
//! # Architecture
//!
//! ```text
//! &[StreamRecord] → Processor::process
//!                       ├── key::LogicalKey      (`<source>#<uuid>` codec)
//!                       ├── OperationType        (INSERT/MODIFY/REMOVE → created/updated/deleted)
//!                       └── handler registry     (source → type → [EventHandler])
//! ```
//!
//! Polling the stream, checkpointing and retries belong to the caller.

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod handler;
pub mod key;
pub mod processor;
pub mod record;

pub use config::{CompositeKeyPolicy, ProcessorBuilder, ProcessorConfig, UnknownOperationPolicy};
pub use context::StreamContext;
pub use error::{BoxError, StreamError};
pub use event::{Event, EventType};
pub use handler::{handler_fn, EventHandler, FnHandler};
pub use key::{sort_key_source, LogicalKey, KEY_SEPARATOR};
pub use processor::{Conversion, Processor};
pub use record::{AttributeValue, OperationType, StreamChange, StreamRecord};
