//! Cancellation / timeout context handed to every handler.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Caller-owned cancellation and deadline signal.
///
/// The processor passes this through to handlers untouched; it is up to each
/// handler whether and how to honour it.
#[derive(Debug, Clone, Default)]
pub struct StreamContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl StreamContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the context to an existing cancellation token.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// `true` once the token is cancelled or the deadline has passed.
    pub fn is_done(&self) -> bool {
        self.cancel.is_cancelled() || self.remaining() == Some(Duration::ZERO)
    }

    /// Resolves when the token is cancelled or the deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline.into()) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}
