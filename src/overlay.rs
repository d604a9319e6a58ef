//! Read-through overlay: "what would a read of `key` return if these
//! pending changesets were applied?", without mutating the backend.
//!
//! The overlay is a stack of changesets, newest first. A lookup scans
//! top-down and the first changeset that mentions `key` wins; if none
//! do, the overlay reports "no information" and the caller falls
//! through to the real backend read. The overlay itself never mutates
//! the queue — any temporary reordering a caller does around a read
//! must be undone before the call returns.

use std::sync::Arc;

use crate::changeset::{Changeset, Op};
use crate::value::Value;

/// The overlay's verdict for a key.
///
/// `None` means no changeset in the queue mentions `key` — fall
/// through to the backend. `Some(None)` means the topmost changeset
/// that mentions `key` has a pending reset on it. `Some(Some(value))`
/// means the topmost changeset that mentions `key` has a pending write
/// of `value`.
pub fn check(queue: &[Arc<Changeset>], key: &str) -> Option<Option<Value>> {
    for changeset in queue {
        match changeset.get(key) {
            Some(Op::Write(v)) => return Some(Some(v)),
            Some(Op::Reset) => return Some(None),
            None => continue,
        }
    }
    None
}
