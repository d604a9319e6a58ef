use std::sync::Arc;

use crate::changeset::Changeset;
use crate::origin::OriginTag;
use crate::path::is_key;
use crate::value::{TypeDescriptor, Value};
use crate::watch::WatchRegistry;

pub mod memory;

// Every concrete backend must provide `read` and `write_batch`; the rest
// default in terms of those two, so a minimal backend is still complete.
pub trait Backend: Send + Sync + 'static {
    fn registry(&self) -> &WatchRegistry;

    // Usually built via `Arc::new_cyclic` so the backend can hand back a
    // strong handle to itself without the caller holding one already.
    fn self_handle(&self) -> Arc<dyn Backend>;

    fn read(&self, key: &str, expected: TypeDescriptor, default_only: bool) -> Option<Value>;

    fn read_user_value(&self, key: &str, expected: TypeDescriptor) -> Option<Value> {
        self.read(key, expected, false)
    }

    fn write_batch(&self, changeset: &Changeset, origin: OriginTag) -> bool;

    fn write(&self, key: &str, value: Value, origin: OriginTag) -> bool {
        if !is_key(key) {
            tracing::warn!(key, "write: not a valid key, contract violation");
            return false;
        }
        let changeset = Changeset::new_write(key, value);
        self.write_batch(&changeset, origin)
    }

    // Reset must always succeed; a backend returning false here is an
    // implementer bug, not a caller error.
    fn reset(&self, key: &str, origin: OriginTag) {
        if !is_key(key) {
            tracing::warn!(key, "reset: not a valid key, contract violation");
            return;
        }
        let changeset = Changeset::new();
        changeset.add_reset(key);
        if !self.write_batch(&changeset, origin) {
            tracing::error!(key, "backend-implementer bug: reset must always succeed");
        }
    }

    fn get_writable(&self, _key: &str) -> bool {
        true
    }

    fn subscribe(&self, _name: &str) {}

    fn unsubscribe(&self, _name: &str) {}

    fn sync(&self) {}
}
