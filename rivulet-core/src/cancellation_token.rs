// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! A cheap, cloneable cancellation flag with both blocking and async waiters.
//!
//! `CancellationToken` backs the `Context` deadline/cancellation machinery
//! (§4.7) and the detached worker threads behind timed operators and
//! `SubscribeOn`/`ObserveOn` (§4.5.4, §4.5.6). It carries no payload — the
//! reason for cancellation, if any, lives on the event that triggered it.

use event_listener::{Event, EventListener};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

/// A cancellation flag that can be cloned and observed from many threads.
///
/// Calling `cancel()` on any clone wakes every blocking or async waiter
/// registered through `wait()` or `cancelled()`.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    event: Event,
}

impl CancellationToken {
    /// Creates a token that is not yet cancelled.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                event: Event::new(),
            }),
        }
    }

    /// Cancels the token, waking every waiter. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.event.notify(usize::MAX);
    }

    /// Returns `true` if `cancel()` has been called on this token or a clone.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Blocks the current thread until the token is cancelled.
    ///
    /// Returns immediately if the token is already cancelled. Used by
    /// detached worker threads (timers, `SubscribeOn`/`ObserveOn` pumps) to
    /// park cheaply between cancellation checks instead of polling.
    pub fn wait(&self) {
        if self.is_cancelled() {
            return;
        }
        let listener = self.inner.event.listen();
        if self.is_cancelled() {
            return;
        }
        listener.wait();
    }

    /// Like [`wait`](Self::wait), but gives up after `timeout` and returns
    /// `false` if the token still hasn't been cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_cancelled() {
            return true;
        }
        let listener = self.inner.event.listen();
        if self.is_cancelled() {
            return true;
        }
        listener.wait_timeout(timeout);
        self.is_cancelled()
    }

    /// Returns a future that resolves when the token is cancelled, for
    /// callers already inside an async context.
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled {
            token: self,
            listener: None,
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`CancellationToken::cancelled()`].
pub struct Cancelled<'a> {
    token: &'a CancellationToken,
    listener: Option<EventListener>,
}

impl<'a> Future for Cancelled<'a> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<()> {
        if self.token.is_cancelled() {
            return Poll::Ready(());
        }

        if self.listener.is_none() {
            self.listener = Some(self.token.inner.event.listen());
            if self.token.is_cancelled() {
                return Poll::Ready(());
            }
        }

        match Pin::new(self.listener.as_mut().unwrap()).poll(cx) {
            Poll::Ready(()) => Poll::Ready(()),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn starts_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent_and_visible_on_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn wait_returns_immediately_once_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        token.wait();
    }

    #[test]
    fn wait_unblocks_when_cancelled_from_another_thread() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = thread::spawn(move || waiter.wait());
        thread::sleep(Duration::from_millis(10));
        token.cancel();
        handle.join().unwrap();
    }

    #[test]
    fn wait_timeout_reports_timeout_when_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.wait_timeout(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        handle.await.unwrap();
    }
}
