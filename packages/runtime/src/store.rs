//! Reactive state store.
//!
//! There is no wrapping step: every [`Obj`] and [`Arr`] already carries its
//! own tracking record, so making a value reactive means registering an
//! observer on it. Children are picked up lazily when read through a
//! tracked parent.

use crate::scheduler::{RootId, Scheduler};
use crate::value::Value;
use tracing::trace;

/// Register `root` as an observer of `value` and return the same handle.
///
/// Non-object values come back unchanged. With `is_root_scope`, function
/// values called by bare name against this object run with `this` bound to
/// it.
pub fn make_reactive(value: &Value, root: RootId, scheduler: &Scheduler, is_root_scope: bool) -> Value {
    match value {
        Value::Object(obj) => {
            let added = obj.tracking().observe(root, scheduler);
            if is_root_scope {
                obj.tracking().set_binds_methods();
            }
            trace!(%root, added, keys = obj.len(), "object tracked");
        }
        Value::Array(arr) => {
            let added = arr.tracking().observe(root, scheduler);
            trace!(%root, added, len = arr.len(), "array tracked");
        }
        _ => {}
    }
    value.clone()
}

/// Stop `root` from observing `value`; children tracked lazily keep the
/// stale id and the runtime ignores renders for unknown roots.
pub fn release(value: &Value, root: RootId) {
    match value {
        Value::Object(obj) => obj.tracking().unobserve(root),
        Value::Array(arr) => arr.tracking().unobserve(root),
        _ => {}
    }
}
