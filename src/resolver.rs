//! Process-wide default backend resolution.
//!
//! Resolved exactly once, consulting `SETTINGS_BACKEND` first and the
//! extension registry second, falling back to the bundled memory
//! backend if neither yields one. The result is cached in a
//! [`OnceLock`]; `sync_default` deliberately avoids touching that lock
//! in a way that would force instantiation, so a process that never
//! read a setting never pays for a default backend it didn't need.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::backend::memory::MemoryBackend;
use crate::backend::Backend;

/// Name of the environment variable consulted before the extension
/// registry. Analogous to `GSETTINGS_BACKEND` in the system this
/// abstraction is modeled on.
pub const ENV_VAR: &str = "SETTINGS_BACKEND";

type Factory = fn() -> Arc<dyn Backend>;

struct RegisteredBackend {
    priority: i32,
    factory: Factory,
}

static EXTENSIONS: OnceLock<Mutex<HashMap<&'static str, RegisteredBackend>>> = OnceLock::new();
static DEFAULT: OnceLock<Arc<dyn Backend>> = OnceLock::new();

fn extensions() -> &'static Mutex<HashMap<&'static str, RegisteredBackend>> {
    EXTENSIONS.get_or_init(|| {
        let mut map = HashMap::new();
        // The bundled fallback registers itself through the same
        // lookup machinery a real out-of-tree backend would use, at
        // the lowest possible priority so any registered concrete
        // backend wins ties.
        map.insert(
            "memory",
            RegisteredBackend {
                priority: i32::MIN,
                factory: memory_factory,
            },
        );
        Mutex::new(map)
    })
}

fn memory_factory() -> Arc<dyn Backend> {
    MemoryBackend::new()
}

/// Register a concrete backend under `name`, with `priority` breaking
/// ties when more than one out-of-tree backend is registered and no
/// environment override names one explicitly. Higher priority wins.
pub fn register_backend(name: &'static str, priority: i32, factory: Factory) {
    extensions()
        .lock()
        .unwrap()
        .insert(name, RegisteredBackend { priority, factory });
}

/// Resolve (on first call) or return the cached process-wide default
/// backend.
pub fn get_default() -> Arc<dyn Backend> {
    DEFAULT.get_or_init(resolve_default).clone()
}

/// Flush the default backend if one has already been instantiated.
/// Deliberately a no-op otherwise, so merely calling this never
/// triggers instantiation just to flush nothing.
pub fn sync_default() {
    if let Some(backend) = DEFAULT.get() {
        backend.sync();
    }
}

fn resolve_default() -> Arc<dyn Backend> {
    let requested = std::env::var(ENV_VAR).ok();

    let (name, backend) = if let Some(requested) = requested.as_deref() {
        match resolve_named(requested) {
            Some(backend) => (requested.to_string(), backend),
            None => {
                tracing::warn!(
                    requested,
                    env = ENV_VAR,
                    "no backend registered under this name, falling back to memory"
                );
                ("memory".to_string(), resolve_named("memory").expect("memory is always registered"))
            }
        }
    } else {
        highest_priority_registered().expect("memory is always registered")
    };

    if name == "memory" && requested.as_deref() != Some("memory") {
        tracing::info!(
            "no backend configured via {ENV_VAR} or the extension registry, \
             falling back to the bundled in-memory backend"
        );
    }

    backend
}

fn resolve_named(name: &str) -> Option<Arc<dyn Backend>> {
    extensions()
        .lock()
        .unwrap()
        .get(name)
        .map(|registered| (registered.factory)())
}

fn highest_priority_registered() -> Option<(String, Arc<dyn Backend>)> {
    extensions()
        .lock()
        .unwrap()
        .iter()
        .max_by_key(|(_, registered)| registered.priority)
        .map(|(name, registered)| (name.to_string(), (registered.factory)()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_name_resolves_without_registration() {
        let backend = resolve_named("memory");
        assert!(backend.is_some());
    }

    #[test]
    fn unknown_name_does_not_resolve() {
        assert!(resolve_named("definitely-not-registered").is_none());
    }

    #[test]
    fn sync_default_is_a_noop_before_instantiation() {
        // Must not panic and must not force DEFAULT to populate.
        sync_default();
        assert!(DEFAULT.get().is_none());
    }
}
