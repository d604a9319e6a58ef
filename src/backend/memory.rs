//! The bundled fallback backend.
//!
//! Concrete storage backends (file, network registry, daemon-backed)
//! are external collaborators per the scope of this crate — but the
//! default resolver needs *something* to fall back to when no
//! external backend is configured, the same way glib's own memory
//! backend ships inside libgio as the built-in fallback rather than as
//! a loadable module. This is that backend: a user layer and a
//! defaults layer, each a plain map, with lockdown tracked separately
//! so `get_writable` can be demonstrated end to end.
//!
//! Shaped after `cosmic_config::Config`/`ConfigTransaction`
//! (`cosmic-config/src/lib.rs`): the same user-path/system-path
//! split, the same "apply all pending changes, then notify" shape —
//! with the filesystem replaced by a map and `notify::Watcher`
//! replaced by this crate's own watch registry.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Weak};

use crate::backend::Backend;
use crate::changeset::Changeset;
use crate::origin::OriginTag;
use crate::path::is_key;
use crate::signal::{changeset_applied, emit_writable_changed};
use crate::value::{TypeDescriptor, Value};
use crate::watch::WatchRegistry;

pub struct MemoryBackend {
    defaults: Mutex<HashMap<String, Value>>,
    user: Mutex<HashMap<String, Value>>,
    locked: Mutex<HashSet<String>>,
    registry: WatchRegistry,
    self_weak: Weak<MemoryBackend>,
}

impl MemoryBackend {
    /// Construct a fresh, empty in-memory backend.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            defaults: Mutex::new(HashMap::new()),
            user: Mutex::new(HashMap::new()),
            locked: Mutex::new(HashSet::new()),
            registry: WatchRegistry::new(),
            self_weak: weak.clone(),
        })
    }

    /// Seed the sysadmin/defaults layer directly, bypassing the
    /// change-signal path — analogous to provisioning `system_path`
    /// files before the process starts.
    pub fn set_default(&self, key: &str, value: Value) {
        if !is_key(key) {
            tracing::warn!(key, "set_default: not a valid key, contract violation");
            return;
        }
        self.defaults.lock().unwrap().insert(key.to_string(), value);
    }

    /// Toggle writability for `key`, emitting `writable_changed` the
    /// way an external lockdown reconfiguration event would: writability
    /// signals always originate externally and carry no origin tag.
    pub fn set_writable(&self, key: &str, writable: bool) {
        if !is_key(key) {
            tracing::warn!(key, "set_writable: not a valid key, contract violation");
            return;
        }
        {
            let mut locked = self.locked.lock().unwrap();
            if writable {
                locked.remove(key);
            } else {
                locked.insert(key.to_string());
            }
        }
        emit_writable_changed(&self.self_handle(), key);
    }
}

impl Backend for MemoryBackend {
    fn registry(&self) -> &WatchRegistry {
        &self.registry
    }

    fn self_handle(&self) -> Arc<dyn Backend> {
        self.self_weak
            .upgrade()
            .expect("backend outlives its own handle")
    }

    fn read(&self, key: &str, expected: TypeDescriptor, default_only: bool) -> Option<Value> {
        if !is_key(key) {
            tracing::warn!(key, "read: not a valid key, contract violation");
            return None;
        }
        let value = if default_only {
            self.defaults.lock().unwrap().get(key).cloned()
        } else {
            self.user
                .lock()
                .unwrap()
                .get(key)
                .cloned()
                .or_else(|| self.defaults.lock().unwrap().get(key).cloned())
        };
        value.filter(|v| v.type_descriptor() == expected)
    }

    fn read_user_value(&self, key: &str, expected: TypeDescriptor) -> Option<Value> {
        if !is_key(key) {
            tracing::warn!(key, "read_user_value: not a valid key, contract violation");
            return None;
        }
        self.user
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .filter(|v| v.type_descriptor() == expected)
    }

    fn write_batch(&self, changeset: &Changeset, origin: OriginTag) -> bool {
        changeset.seal();

        // Resets always succeed regardless of lockdown — locking only
        // blocks overriding the default, not falling back to it.
        let mut locked_hit = false;
        {
            let locked = self.locked.lock().unwrap();
            changeset.for_each(|key, value| {
                if value.is_some() && locked.contains(key) {
                    locked_hit = true;
                }
            });
        }
        if locked_hit {
            tracing::warn!("write_batch: refusing, changeset writes a locked key");
            return false;
        }

        let mut touched = false;
        {
            let mut user = self.user.lock().unwrap();
            changeset.for_each(|key, value| {
                if !is_key(key) {
                    tracing::warn!(key, "write_batch: skipping invalid key in changeset");
                    return;
                }
                match value {
                    Some(v) => {
                        user.insert(key.to_string(), v.clone());
                    }
                    None => {
                        user.remove(key);
                    }
                }
                touched = true;
            });
        }
        if touched {
            changeset_applied(&self.self_handle(), changeset, origin);
        }
        true
    }

    fn get_writable(&self, key: &str) -> bool {
        !self.locked.lock().unwrap().contains(key)
    }
}
