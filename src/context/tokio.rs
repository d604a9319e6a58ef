//! A [`DispatchContext`] backed by a `tokio` runtime handle.

use tokio::runtime::Handle;

use crate::context::DispatchContext;

/// Posts closures onto a tokio runtime's blocking thread pool, so a
/// watch registered with this context runs its callback off whatever
/// thread produced the signal, on the runtime `handle` was taken from.
pub struct TokioContext {
    handle: Handle,
}

impl TokioContext {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime of the calling context.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime, per `Handle::current`.
    pub fn current() -> Self {
        Self {
            handle: Handle::current(),
        }
    }
}

impl DispatchContext for TokioContext {
    fn post(&self, job: Box<dyn FnOnce() + Send>) {
        self.handle.spawn_blocking(move || job());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn posted_job_runs_on_the_runtime() {
        let context = TokioContext::current();
        let ran = Arc::new(AtomicBool::new(false));
        let r = ran.clone();
        context.post(Box::new(move || {
            r.store(true, Ordering::SeqCst);
        }));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(ran.load(Ordering::SeqCst));
    }
}
