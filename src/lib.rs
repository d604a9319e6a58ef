//! A pluggable storage layer for hierarchically-keyed, typed
//! configuration values, with change-notification fan-out to
//! subscribers across concurrent execution contexts.
//!
//! This crate is the **backend abstraction** a higher-level typed
//! settings object would sit on top of — that consumer, concrete
//! storage backends (file, network registry, daemon-backed), and any
//! particular wire or disk format are all out of scope here. What is
//! in scope: the abstract [`Backend`] contract and its default
//! behaviors, the [`watch`]/dispatch engine, key/path lexical rules,
//! [`Changeset`]s and the read-through overlay, and process-wide
//! default-backend selection.
//!
//! The hard part is the observer fabric: safely delivering change
//! notifications to targets that may be destroyed concurrently from
//! arbitrary threads, while respecting per-subscriber dispatch
//! contexts and preserving causal ordering. See [`watch`] and
//! [`signal`] for that machinery.

pub mod backend;
pub mod changeset;
pub mod context;
pub mod origin;
pub mod overlay;
pub mod path;
pub mod resolver;
pub mod signal;
pub mod value;
pub mod watch;

use std::any::Any;
use std::sync::Arc;

pub use backend::Backend;
pub use changeset::{Changeset, Op};
pub use context::DispatchContext;
pub use origin::OriginTag;
pub use path::{is_dir, is_key, is_path};
pub use signal::Callbacks;
pub use value::{TypeDescriptor, Value};

/// Read `key` as a `T`, optionally consulting a read-through overlay
/// of pending changesets first (newest on top).
///
/// Composition: consult the overlay; if it has no opinion,
/// consult `read_user_value` unless `default_only`; if that also has
/// no opinion (or `user_only` is set), fall back to `read`. The result
/// is always re-checked against `T`'s type and suppressed — not
/// surfaced as an error — on a mismatch, per the anti-corruption
/// boundary between a backend's raw storage and what a caller asked for.
pub fn read_value<T: Any + Clone>(
    backend: &Arc<dyn Backend>,
    key: &str,
    read_through: Option<&[Arc<Changeset>]>,
    user_only: bool,
    default_only: bool,
) -> Option<T> {
    if !is_key(key) {
        tracing::warn!(key, "read_value: not a valid key, contract violation");
        return None;
    }
    let expected = TypeDescriptor::of::<T>();

    if let Some(queue) = read_through {
        if let Some(overlaid) = overlay::check(queue, key) {
            return overlaid.and_then(|v| v.get::<T>());
        }
    }

    let value = if user_only {
        backend.read_user_value(key, expected)
    } else if default_only {
        backend.read(key, expected, true)
    } else {
        backend
            .read_user_value(key, expected)
            .or_else(|| backend.read(key, expected, false))
    };
    value.and_then(|v| v.get::<T>())
}

/// Write `value` at `key`, tagging the mutation with `origin`.
pub fn write(backend: &Arc<dyn Backend>, key: &str, value: Value, origin: OriginTag) -> bool {
    backend.write(key, value, origin)
}

/// Commit every entry in `changeset` atomically, from the caller's
/// point of view.
pub fn write_changeset(backend: &Arc<dyn Backend>, changeset: &Changeset, origin: OriginTag) -> bool {
    backend.write_batch(changeset, origin)
}

/// Reset `key` to its default. Always succeeds from the caller's
/// perspective — a backend that cannot honor this is a backend bug,
/// diagnosed rather than surfaced as an error.
pub fn reset(backend: &Arc<dyn Backend>, key: &str, origin: OriginTag) {
    backend.reset(key, origin)
}

/// Whether `key` can currently be written.
pub fn get_writable(backend: &Arc<dyn Backend>, key: &str) -> bool {
    backend.get_writable(key)
}

/// Hint that `name` will be of interest soon.
pub fn subscribe(backend: &Arc<dyn Backend>, name: &str) {
    backend.subscribe(name);
}

/// Hint that `name` is no longer of interest.
pub fn unsubscribe(backend: &Arc<dyn Backend>, name: &str) {
    backend.unsubscribe(name);
}

/// Register `target` for change-signal delivery on `backend`. The
/// registry takes only a weak relation on `target` — see
/// [`watch::WatchRegistry`] for the lifetime-safety contract.
pub fn watch<T: Send + Sync + 'static>(
    backend: &Arc<dyn Backend>,
    target: &Arc<T>,
    callbacks: Callbacks,
    context: Option<Arc<dyn DispatchContext>>,
) {
    backend.registry().watch(target, callbacks, context);
}

/// Remove the watch registered for `target`. The caller must hold a
/// live reference to `target`.
pub fn unwatch<T: Send + Sync + 'static>(backend: &Arc<dyn Backend>, target: &Arc<T>) {
    backend.registry().unwatch(target);
}

/// The process-wide default backend, resolved once and cached — see
/// [`resolver`] for the resolution order.
pub fn get_default() -> Arc<dyn Backend> {
    resolver::get_default()
}

/// Flush the default backend, if one has already been instantiated.
pub fn sync_default() {
    resolver::sync_default();
}
