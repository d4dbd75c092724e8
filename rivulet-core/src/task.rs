// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The "detached worker" scheduling tier (§5): a plain OS thread with
//! cooperative cancellation, used by `Interval`, `Timer`, `Delay`, and the
//! `SubscribeOn`/`ObserveOn` detach queues. There is no global scheduler —
//! each of those operators spawns its own `RivuletTask` per subscription.

use crate::CancellationToken;
use std::thread::JoinHandle;

/// A background thread handle with automatic, idempotent cancellation on
/// drop.
///
/// The spawned closure receives a [`CancellationToken`] it should poll (via
/// `is_cancelled()` or block on with `wait()`/`wait_timeout()`) to know when
/// to stop. Dropping or explicitly cancelling a `RivuletTask` signals the
/// token; it does not forcibly kill the thread, so the closure must
/// actually check the token to exit promptly.
pub struct RivuletTask {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl RivuletTask {
    /// Spawns a background thread running `f(token)`.
    pub fn spawn<F>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let handle = std::thread::spawn(move || f(cancel_clone));
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Signals the worker to stop. Does not block for it to exit; call
    /// [`join`](Self::join) for that.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once `cancel()` has been called (by us or by drop).
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels the task and blocks until the worker thread has exited.
    ///
    /// If called from inside the worker thread itself — e.g. the worker
    /// delivered a terminal notification whose downstream unsubscribe
    /// synchronously runs a finalizer that joins this very task — joining
    /// would deadlock, so this detaches instead; the thread is already on
    /// its way out.
    ///
    /// # Panics
    /// Propagates a panic from the worker thread, matching
    /// `JoinHandle::join`'s own contract, except in the self-join case
    /// above where no panic can be observed.
    pub fn join(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == std::thread::current().id() {
                return;
            }
            handle.join().expect("rivulet worker thread panicked");
        }
    }
}

impl Drop for RivuletTask {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn worker_stops_when_cancelled() {
        let counter = Arc::new(AtomicUsize::new(0));
        let worker_counter = Arc::clone(&counter);
        let task = RivuletTask::spawn(move |cancel| {
            while !cancel.is_cancelled() {
                worker_counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(1));
            }
        });
        std::thread::sleep(Duration::from_millis(20));
        task.join();
        assert!(counter.load(Ordering::SeqCst) > 0);
    }

    #[test]
    fn drop_signals_cancellation() {
        let task = RivuletTask::spawn(|cancel| cancel.wait());
        drop(task);
    }
}
