//! The opaque, type-erased value cell stored at a key.
//!
//! The model assumes a single universal variant type system; all this
//! crate needs from it is type-of, type-match, and cheap reference-
//! counted sharing. We get all three from `Arc<dyn Any + Send + Sync>`
//! plus a cached [`std::any::TypeId`], without committing to any
//! particular wire or disk encoding — that choice belongs to a
//! concrete backend, not the core.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A type descriptor, matchable for equality against another value's
/// type or against an expected Rust type.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TypeDescriptor {
    id: TypeId,
    name: &'static str,
}

impl TypeDescriptor {
    /// The type descriptor for `T`.
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The Rust type name, for diagnostics only — never parsed.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A reference-counted, type-erased value.
///
/// Cloning a `Value` is cheap (an `Arc` clone); it never deep-copies
/// the payload.
#[derive(Clone)]
pub struct Value {
    descriptor: TypeDescriptor,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Value {
    /// Wrap `v` as an opaque value. `T` becomes the value's type.
    pub fn new<T: Any + Send + Sync>(v: T) -> Self {
        Self {
            descriptor: TypeDescriptor::of::<T>(),
            payload: Arc::new(v),
        }
    }

    /// The value's type descriptor.
    pub fn type_descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    /// True if the value's stored type matches `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.descriptor.id == TypeId::of::<T>()
    }

    /// Retrieve the payload as `T`, or `None` if the stored type does
    /// not match — a mismatched type is suppressed here, not an error.
    pub fn get<T: Any + Clone>(&self) -> Option<T> {
        self.payload.downcast_ref::<T>().cloned()
    }

    /// Borrow the payload as `T` without cloning, or `None` on a type
    /// mismatch.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value").field("type", &self.descriptor).finish()
    }
}

/// Two values are equal if they are the same type *and* the same
/// shared payload — this is identity, not structural equality (the
/// erased payload can't be compared generically). Sufficient for
/// overlay/changeset bookkeeping, which only ever asks "is this the
/// value I just put in".
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor == other.descriptor && Arc::ptr_eq(&self.payload, &other.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_checked_retrieval() {
        let v = Value::new(7i32);
        assert_eq!(v.get::<i32>(), Some(7));
        assert_eq!(v.get::<String>(), None);
        assert!(v.is::<i32>());
        assert!(!v.is::<String>());
    }

    #[test]
    fn cheap_sharing() {
        let v = Value::new(String::from("dark"));
        let v2 = v.clone();
        assert_eq!(v2.get::<String>().as_deref(), Some("dark"));
    }
}
