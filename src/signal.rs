use std::sync::Arc;

use crate::backend::Backend;
use crate::changeset::Changeset;
use crate::origin::OriginTag;

pub type ChangedCallback = Arc<dyn Fn(&str, OriginTag) + Send + Sync>;
pub type KeysChangedCallback = Arc<dyn Fn(&str, &[String], OriginTag) + Send + Sync>;
pub type PathChangedCallback = Arc<dyn Fn(&str, OriginTag) + Send + Sync>;
pub type WritableChangedCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type PathWritableChangedCallback = Arc<dyn Fn(&str) + Send + Sync>;

// Any subset may be absent; a signal with no matching callback simply
// produces no dispatch job for that watch.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub changed: Option<ChangedCallback>,
    pub keys_changed: Option<KeysChangedCallback>,
    pub path_changed: Option<PathChangedCallback>,
    pub writable_changed: Option<WritableChangedCallback>,
    pub path_writable_changed: Option<PathWritableChangedCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_changed(mut self, f: impl Fn(&str, OriginTag) + Send + Sync + 'static) -> Self {
        self.changed = Some(Arc::new(f));
        self
    }

    pub fn on_keys_changed(
        mut self,
        f: impl Fn(&str, &[String], OriginTag) + Send + Sync + 'static,
    ) -> Self {
        self.keys_changed = Some(Arc::new(f));
        self
    }

    pub fn on_path_changed(mut self, f: impl Fn(&str, OriginTag) + Send + Sync + 'static) -> Self {
        self.path_changed = Some(Arc::new(f));
        self
    }

    pub fn on_writable_changed(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.writable_changed = Some(Arc::new(f));
        self
    }

    pub fn on_path_writable_changed(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.path_writable_changed = Some(Arc::new(f));
        self
    }
}

// Payload is duplicated, never borrowed, so it can be copied into a
// dispatch closure under lock and delivered after the lock releases.
#[derive(Clone, Debug)]
pub enum ChangeSignal {
    Changed { key: Arc<str>, origin: OriginTag },
    KeysChanged {
        dir: Arc<str>,
        keys: Arc<[String]>,
        origin: OriginTag,
    },
    PathChanged { dir: Arc<str>, origin: OriginTag },
    // Writability signals always originate externally; no origin tag.
    WritableChanged { key: Arc<str> },
    PathWritableChanged { dir: Arc<str> },
}

pub fn emit_changed(backend: &Arc<dyn Backend>, key: &str, origin: OriginTag) {
    backend.registry().dispatch(
        backend.clone(),
        ChangeSignal::Changed {
            key: Arc::from(key),
            origin,
        },
    );
}

pub fn emit_keys_changed(backend: &Arc<dyn Backend>, dir: &str, keys: &[String], origin: OriginTag) {
    backend.registry().dispatch(
        backend.clone(),
        ChangeSignal::KeysChanged {
            dir: Arc::from(dir),
            keys: Arc::from(keys),
            origin,
        },
    );
}

pub fn emit_path_changed(backend: &Arc<dyn Backend>, dir: &str, origin: OriginTag) {
    backend.registry().dispatch(
        backend.clone(),
        ChangeSignal::PathChanged {
            dir: Arc::from(dir),
            origin,
        },
    );
}

pub fn emit_writable_changed(backend: &Arc<dyn Backend>, key: &str) {
    backend.registry().dispatch(
        backend.clone(),
        ChangeSignal::WritableChanged { key: Arc::from(key) },
    );
}

pub fn emit_path_writable_changed(backend: &Arc<dyn Backend>, dir: &str) {
    backend.registry().dispatch(
        backend.clone(),
        ChangeSignal::PathWritableChanged { dir: Arc::from(dir) },
    );
}

pub fn changeset_applied(backend: &Arc<dyn Backend>, changeset: &Changeset, origin: OriginTag) {
    let (prefix, keys, ops) = changeset.describe();
    if ops.is_empty() {
        return;
    }
    if keys.len() == 1 && keys[0].is_empty() {
        // prefix is the full absolute key
        emit_changed(backend, &prefix, origin);
    } else {
        emit_keys_changed(backend, &prefix, &keys, origin);
    }
}
