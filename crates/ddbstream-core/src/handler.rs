//! Event handler trait and closure adapter.

use std::future::Future;

use async_trait::async_trait;

use crate::context::StreamContext;
use crate::error::BoxError;
use crate::event::Event;

/// Trait for user-provided event handlers.
///
/// Register an implementation with
/// [`Processor::register_handler`](crate::Processor::register_handler) for a
/// `(source, event type)` pair. Returning an error stops the current batch.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: &StreamContext, event: &Event) -> Result<(), BoxError>;
}

/// Handler backed by an async closure. Built with [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Wrap a closure `Fn(StreamContext, Event) -> impl Future<Output = Result<(), BoxError>>`
/// as an [`EventHandler`].
///
/// The closure receives owned clones so the returned future can be `'static`.
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(StreamContext, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(StreamContext, Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn handle(&self, ctx: &StreamContext, event: &Event) -> Result<(), BoxError> {
        (self.f)(ctx.clone(), event.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    fn dummy_event() -> Event {
        Event {
            source: "orders".into(),
            event_type: EventType::Created,
            id: Uuid::nil(),
            pk: "orders#00000000-0000-0000-0000-000000000000".into(),
            sk: "orders".into(),
        }
    }

    #[tokio::test]
    async fn closure_handler_sees_event() {
        let count = Arc::new(AtomicU32::new(0));
        let seen = count.clone();
        let handler = handler_fn(move |_ctx, event: Event| {
            let seen = seen.clone();
            async move {
                assert_eq!(event.source, "orders");
                seen.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
        });

        handler.handle(&StreamContext::new(), &dummy_event()).await.unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn closure_handler_error_propagates() {
        let handler = handler_fn(|_ctx, _event| async { Err::<(), BoxError>("nope".into()) });
        let err = handler
            .handle(&StreamContext::new(), &dummy_event())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
