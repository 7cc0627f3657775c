#![forbid(unsafe_code)]

//! The active-watcher slot.
//!
//! While a [`Watcher`](crate::Watcher) evaluates its expression, it occupies a
//! thread-local slot. Every tracked property read consults the slot and, when
//! it is occupied, subscribes the occupant to that property's [`Dep`].
//!
//! The slot is only ever changed through [`TrackingScope`], an RAII guard that
//! remembers the previous occupant and puts it back on drop. Nested
//! evaluations therefore restore the outer watcher, and a panic inside an
//! evaluation still clears the slot while unwinding.
//!
//! [`Dep`]: crate::Dep

use std::cell::RefCell;
use std::rc::Rc;

use crate::watcher::WatcherInner;

thread_local! {
    static ACTIVE: RefCell<Option<Rc<WatcherInner>>> = const { RefCell::new(None) };
}

/// RAII guard over the active-watcher slot.
#[must_use = "dropping this guard immediately restores the previous watcher"]
pub(crate) struct TrackingScope {
    previous: Option<Rc<WatcherInner>>,
}

impl TrackingScope {
    /// Make `watcher` the active watcher until the guard drops.
    pub(crate) fn enter(watcher: Rc<WatcherInner>) -> Self {
        Self::swap(Some(watcher))
    }

    /// Clear the slot until the guard drops.
    pub(crate) fn suspend() -> Self {
        Self::swap(None)
    }

    fn swap(next: Option<Rc<WatcherInner>>) -> Self {
        let previous = ACTIVE.with(|slot| slot.replace(next));
        Self { previous }
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// The watcher currently evaluating, if any.
pub(crate) fn active() -> Option<Rc<WatcherInner>> {
    ACTIVE.with(|slot| slot.borrow().clone())
}

/// Whether a watcher is currently evaluating on this thread.
#[must_use]
pub fn is_tracking() -> bool {
    ACTIVE.with(|slot| slot.borrow().is_some())
}

/// Run `f` with dependency tracking switched off.
///
/// Reads performed inside `f` are never attributed to the enclosing watcher.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _scope = TrackingScope::suspend();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use crate::watcher::Watcher;
    use serde_json::json;

    fn watcher(data: &Object, expr: &str) -> Watcher {
        Watcher::new(data, expr, |_| Ok(())).expect("watcher")
    }

    #[test]
    fn slot_is_empty_outside_evaluation() {
        assert!(!is_tracking());
        assert!(active().is_none());
    }

    #[test]
    fn nested_scopes_restore_outer_watcher() {
        let data = Object::from_json(json!({"a": 1})).expect("object");
        let outer = watcher(&data, "a");
        let inner = watcher(&data, "a");

        let _outer_scope = TrackingScope::enter(outer.inner_rc());
        {
            let _inner_scope = TrackingScope::enter(inner.inner_rc());
            assert!(Rc::ptr_eq(&active().expect("inner"), &inner.inner_rc()));
        }
        assert!(Rc::ptr_eq(&active().expect("outer"), &outer.inner_rc()));
    }

    #[test]
    fn untracked_clears_and_restores() {
        let data = Object::from_json(json!({"a": 1})).expect("object");
        let w = watcher(&data, "a");
        let _scope = TrackingScope::enter(w.inner_rc());
        untracked(|| assert!(!is_tracking()));
        assert!(is_tracking());
    }

    #[test]
    fn slot_is_restored_after_panic() {
        let data = Object::from_json(json!({"a": 1})).expect("object");
        let w = watcher(&data, "a");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = TrackingScope::enter(w.inner_rc());
            panic!("evaluation blew up");
        }));
        assert!(result.is_err());
        assert!(!is_tracking());
    }
}
