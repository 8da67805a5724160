use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio_retry::strategy::jitter;
use tokio_retry::RetryIf;
use tracing::warn;

use super::{History, OutgoingMessage, VkApi};
use crate::config::RetryConfig;
use crate::cursor::Cursor;
use crate::error::CallError;

/// Re-issues calls that failed before VK could answer (connection errors,
/// bad HTTP status, undecodable bodies) with exponential backoff and jitter.
/// API-level errors are returned immediately.
pub struct RetryingApi<A> {
    inner: A,
    policy: RetryConfig,
}

impl<A: VkApi> RetryingApi<A> {
    pub fn new(inner: A, policy: RetryConfig) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    async fn retry_transient<F, Fut, T>(&self, what: &str, operation: F) -> Result<T, CallError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let strategy = backoff_delays(&self.policy).map(jitter);

        RetryIf::start(strategy, operation, |e: &CallError| {
            let transient = e.is_transient();
            if transient {
                warn!("{} failed, retrying: {}", what, e);
            }
            transient
        })
        .await
        .map_err(|e| {
            if e.is_transient() {
                warn!(
                    "{} failed after {} retries: {}",
                    what, self.policy.max_retries, e
                );
            }
            e
        })
    }
}

/// Delay before each retry, before jitter: `initial_backoff_ms`, then doubling,
/// capped at `max_backoff_ms`, `max_retries` of them.
pub fn backoff_delays(policy: &RetryConfig) -> impl Iterator<Item = Duration> {
    let max = policy.max_backoff_ms;
    std::iter::successors(Some(policy.initial_backoff_ms), |ms| {
        Some(ms.saturating_mul(2))
    })
    .map(move |ms| Duration::from_millis(ms.min(max)))
    .take(policy.max_retries)
}

#[async_trait]
impl<A: VkApi> VkApi for RetryingApi<A> {
    async fn get_long_poll_server(&self) -> Result<Cursor, CallError> {
        self.retry_transient("messages.getLongPollServer", move || {
            self.inner.get_long_poll_server()
        })
        .await
    }

    async fn get_long_poll_history(&self, cursor: &Cursor) -> Result<History, CallError> {
        self.retry_transient("messages.getLongPollHistory", move || {
            self.inner.get_long_poll_history(cursor)
        })
        .await
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<i64, CallError> {
        self.retry_transient("messages.send", move || self.inner.send_message(message))
            .await
    }
}
