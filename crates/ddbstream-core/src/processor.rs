//! The stream processor. Converts change records to events and dispatches
//! them to handlers registered per `(source, event type)`.
//!
//! # Per-record flow
//!
//! ```text
//! StreamRecord
//!   ├── read PK / SK string attributes
//!   ├── LogicalKey::parse(PK)            → (source, id)   fail-fast on error
//!   ├── sort_key_source(SK) != source?   → CompositeKeyPolicy
//!   ├── OperationType::event_type()      → UnknownOperationPolicy
//!   └── handlers[source][type]           → awaited in registration order
//! ```
//!
//! Records are handled strictly in input order on the caller's task. The first
//! error stops the batch; effects of handlers that already ran are kept.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::config::{CompositeKeyPolicy, ProcessorConfig, UnknownOperationPolicy};
use crate::context::StreamContext;
use crate::error::{BoxError, StreamError};
use crate::event::{Event, EventType};
use crate::handler::{handler_fn, EventHandler};
use crate::key::{sort_key_source, LogicalKey};
use crate::record::StreamRecord;

/// Outcome of converting a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// The record maps to an event.
    Event(Event),
    /// The sort key belongs to a different namespace than the primary key.
    CompositeKey { source: String, sk_source: String },
    /// The operation has no event type and the policy is to ignore it.
    Unmapped { operation: String },
}

type Registry = HashMap<String, HashMap<EventType, Vec<Arc<dyn EventHandler>>>>;

/// Converts change-record batches to events and fans them out to handlers.
///
/// Each processor owns its own registry. Registration needs `&mut self`, so it
/// happens during setup; `process` only reads the registry. Registering while
/// a batch is in flight is rejected at compile time:
///
/// ```compile_fail
/// use ddbstream_core::{EventType, Processor, StreamContext};
///
/// let mut processor = Processor::new();
/// let ctx = StreamContext::new();
/// let pending = processor.process(&ctx, &[]);
/// processor.register_fn("orders", EventType::Created, |_ctx, _event| async { Ok(()) });
/// drop(pending);
/// ```
///
/// After setup the processor can be shared as `Arc<Processor>`.
pub struct Processor {
    config: ProcessorConfig,
    handlers: Registry,
}

impl Processor {
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default())
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        Self {
            config,
            handlers: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Append a handler for `(source, event_type)`.
    ///
    /// Handlers are never de-duplicated; registering the same one twice makes
    /// it run twice.
    pub fn register_handler(
        &mut self,
        source: impl Into<String>,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
    ) {
        self.handlers
            .entry(source.into())
            .or_default()
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    /// Register an async closure as a handler.
    pub fn register_fn<F, Fut>(&mut self, source: impl Into<String>, event_type: EventType, f: F)
    where
        F: Fn(StreamContext, Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.register_handler(source, event_type, Arc::new(handler_fn(f)));
    }

    /// Handlers registered for `(source, event_type)`, in registration order.
    pub fn handlers_for(&self, source: &str, event_type: EventType) -> &[Arc<dyn EventHandler>] {
        self.handlers
            .get(source)
            .and_then(|by_type| by_type.get(&event_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers
            .values()
            .flat_map(|by_type| by_type.values())
            .map(Vec::len)
            .sum()
    }

    /// Convert one record without dispatching it.
    pub fn convert(&self, record: &StreamRecord) -> Result<Conversion, StreamError> {
        let pk = self.string_key(record, &self.config.pk_attribute)?;
        let sk = self.string_key(record, &self.config.sk_attribute)?;

        let key = LogicalKey::parse(pk)?;
        let sk_source = sort_key_source(sk);
        if key.source != sk_source {
            return Ok(Conversion::CompositeKey {
                source: key.source,
                sk_source: sk_source.to_string(),
            });
        }

        let event_type = match record.operation.event_type() {
            Some(ty) => ty,
            None => {
                let operation = record.operation.to_string();
                return match self.config.unknown_operations {
                    UnknownOperationPolicy::Ignore => Ok(Conversion::Unmapped { operation }),
                    UnknownOperationPolicy::Reject => Err(StreamError::UnknownOperation { operation }),
                };
            }
        };

        Ok(Conversion::Event(Event {
            source: key.source,
            event_type,
            id: key.id,
            pk: pk.to_string(),
            sk: sk.to_string(),
        }))
    }

    /// Process a batch of records in order.
    ///
    /// Returns the first error raised by key decoding or by a handler; records
    /// after it are not looked at.
    pub async fn process(
        &self,
        ctx: &StreamContext,
        records: &[StreamRecord],
    ) -> Result<(), StreamError> {
        let mut dispatched = 0usize;

        for (index, record) in records.iter().enumerate() {
            let event = match self.convert(record)? {
                Conversion::Event(event) => event,
                Conversion::CompositeKey { source, sk_source } => match self.config.composite_keys {
                    CompositeKeyPolicy::StopBatch => {
                        tracing::debug!(
                            index,
                            %source,
                            %sk_source,
                            remaining = records.len() - index,
                            "Composite-key record, stopping batch"
                        );
                        break;
                    }
                    CompositeKeyPolicy::SkipRecord => {
                        tracing::trace!(index, %source, %sk_source, "Skipping composite-key record");
                        continue;
                    }
                },
                Conversion::Unmapped { operation } => {
                    tracing::trace!(index, %operation, "No event type for operation");
                    continue;
                }
            };

            dispatched += self.dispatch(ctx, &event).await?;
        }

        tracing::debug!(records = records.len(), dispatched, "Batch processed");
        Ok(())
    }

    /// Run every handler for `event`. Returns how many ran.
    async fn dispatch(&self, ctx: &StreamContext, event: &Event) -> Result<usize, StreamError> {
        let handlers = self.handlers_for(&event.source, event.event_type);
        if handlers.is_empty() {
            tracing::trace!(
                namespace = %event.source,
                event_type = %event.event_type,
                id = %event.id,
                "No handlers registered"
            );
            return Ok(0);
        }

        for (position, handler) in handlers.iter().enumerate() {
            if let Err(source) = handler.handle(ctx, event).await {
                tracing::warn!(
                    namespace = %event.source,
                    event_type = %event.event_type,
                    id = %event.id,
                    handler = position,
                    error = %source,
                    "Handler failed"
                );
                return Err(StreamError::HandlerFailure {
                    namespace: event.source.clone(),
                    event_type: event.event_type,
                    id: event.id,
                    source,
                });
            }
        }

        tracing::trace!(
            namespace = %event.source,
            event_type = %event.event_type,
            id = %event.id,
            handlers = handlers.len(),
            "Event dispatched"
        );
        Ok(handlers.len())
    }

    fn string_key<'r>(&self, record: &'r StreamRecord, name: &str) -> Result<&'r str, StreamError> {
        record
            .string_key(name)
            .ok_or_else(|| StreamError::MissingKeyAttribute {
                attribute: name.to_string(),
            })
    }
}

// `Arc<Processor>` must stay shareable across tasks.
const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Processor>();
};

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessorBuilder;
    use crate::record::{AttributeValue, OperationType};
    use std::sync::atomic::{AtomicU32, Ordering};

    const PK: &str = "orders#3fa85f64-5717-4562-b3fc-2c963f66afa6";

    fn counting(
        count: &Arc<AtomicU32>,
    ) -> impl Fn(StreamContext, Event) -> std::future::Ready<Result<(), BoxError>> + Send + Sync + 'static
    {
        let count = count.clone();
        move |_ctx, _event| {
            count.fetch_add(1, Ordering::Relaxed);
            std::future::ready(Ok(()))
        }
    }

    #[test]
    fn registration_is_additive() {
        let count = Arc::new(AtomicU32::new(0));
        let mut p = Processor::new();
        p.register_fn("orders", EventType::Created, counting(&count));
        p.register_fn("orders", EventType::Created, counting(&count));
        p.register_fn("orders", EventType::Deleted, counting(&count));

        assert_eq!(p.handler_count(), 3);
        assert_eq!(p.handlers_for("orders", EventType::Created).len(), 2);
        assert!(p.handlers_for("orders", EventType::Updated).is_empty());
        assert!(p.handlers_for("users", EventType::Created).is_empty());
    }

    #[test]
    fn convert_builds_event() {
        let p = Processor::new();
        let record = StreamRecord::new(OperationType::Modify, PK, "orders#LINEITEM#1");
        match p.convert(&record).unwrap() {
            Conversion::Event(event) => {
                assert_eq!(event.source, "orders");
                assert_eq!(event.event_type, EventType::Updated);
                assert_eq!(event.pk, PK);
                assert_eq!(event.sk, "orders#LINEITEM#1");
            }
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn convert_flags_composite_key() {
        let p = Processor::new();
        let record = StreamRecord::new(OperationType::Insert, PK, "customers#42");
        assert_eq!(
            p.convert(&record).unwrap(),
            Conversion::CompositeKey {
                source: "orders".into(),
                sk_source: "customers".into(),
            }
        );
    }

    #[test]
    fn convert_reports_missing_sort_key() {
        let p = Processor::new();
        let mut record = StreamRecord::new(OperationType::Insert, PK, "orders");
        record.change.keys.remove("SK");
        let err = p.convert(&record).unwrap_err();
        assert!(matches!(err, StreamError::MissingKeyAttribute { ref attribute } if attribute == "SK"));
    }

    #[test]
    fn convert_uses_configured_attribute_names() {
        let p = ProcessorBuilder::new().pk_attribute("pk").sk_attribute("sk").build();
        let record = StreamRecord::new(OperationType::Insert, "ignored", "ignored")
            .with_key("pk", AttributeValue::S(PK.into()))
            .with_key("sk", AttributeValue::S("orders".into()));
        assert!(matches!(p.convert(&record).unwrap(), Conversion::Event(_)));
    }

    #[test]
    fn unknown_operation_policies() {
        let record = StreamRecord::new(OperationType::Unknown("PURGE".into()), PK, "orders");

        let ignore = Processor::new();
        assert_eq!(
            ignore.convert(&record).unwrap(),
            Conversion::Unmapped {
                operation: "PURGE".into()
            }
        );

        let reject = ProcessorBuilder::new()
            .unknown_operations(UnknownOperationPolicy::Reject)
            .build();
        let err = reject.convert(&record).unwrap_err();
        assert!(matches!(err, StreamError::UnknownOperation { ref operation } if operation == "PURGE"));
    }

    #[tokio::test]
    async fn shared_processor_runs_on_spawned_task() {
        let count = Arc::new(AtomicU32::new(0));
        let mut processor = Processor::new();
        processor.register_fn("orders", EventType::Created, counting(&count));
        let processor = Arc::new(processor);

        let shared = processor.clone();
        tokio::spawn(async move {
            let batch = [StreamRecord::new(OperationType::Insert, PK, "orders")];
            shared.process(&StreamContext::new(), &batch).await
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(count.load(Ordering::Relaxed), 1);
        assert_eq!(processor.handler_count(), 1);
    }

    #[tokio::test]
    async fn processors_have_independent_registries() {
        let count = Arc::new(AtomicU32::new(0));
        let mut first = Processor::new();
        first.register_fn("orders", EventType::Created, counting(&count));
        let second = Processor::new();

        let batch = [StreamRecord::new(OperationType::Insert, PK, "orders")];
        second.process(&StreamContext::new(), &batch).await.unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 0);

        first.process(&StreamContext::new(), &batch).await.unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }
}
