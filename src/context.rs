//! Dispatch contexts: the execution context a watch's callbacks must
//! be invoked on, or absent meaning "any context is fine" (delivered
//! synchronously on whatever thread produced the signal).
//!
//! `None` context gives synchronous, in-order delivery matching
//! production order. A context trades that ordering guarantee for
//! running callbacks where the watch's owner actually lives — e.g. a
//! GUI event loop thread.

/// Posts closures onto some other execution context's work queue.
///
/// Implementations must not invoke `job` synchronously from inside
/// `post` itself unless that is genuinely the context's delivery
/// model — the dispatcher has already released its lock by the time
/// `post` is called, so reentrancy into `watch`/`unwatch` from within
/// `job` is safe either way, but blocking inside `post` waiting for
/// `job` to finish would reintroduce a deadlock risk if that callback
/// in turn tries to post to a queue this thread is draining.
pub trait DispatchContext: Send + Sync {
    fn post(&self, job: Box<dyn FnOnce() + Send>);
}

#[cfg(feature = "calloop")]
pub mod calloop;

#[cfg(feature = "tokio")]
pub mod tokio;
