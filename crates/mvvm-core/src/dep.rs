#![forbid(unsafe_code)]

//! Per-property subscriber lists.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in subscription order.
//! 2. A watcher appears at most once in a given list.
//! 3. `notify` updates every live subscriber, even when earlier ones fail, and
//!    reports all failures together.
//! 4. Subscribers are held weakly; dead entries are pruned lazily during
//!    `notify`.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::error::{NotifyError, UpdateFailure};
use crate::tracking;
use crate::watcher::WatcherInner;

static NEXT_DEP_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a [`Dep`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

impl fmt::Display for DepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dep#{}", self.0)
    }
}

struct DepInner {
    id: DepId,
    subscribers: RefCell<Vec<Weak<WatcherInner>>>,
}

/// Subscriber list attached to one reactive property.
///
/// Cloning a `Dep` yields another handle to the same list.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

impl Dep {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: DepId(NEXT_DEP_ID.fetch_add(1, Ordering::Relaxed)),
                subscribers: RefCell::new(Vec::new()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Record a read of the owning property.
    ///
    /// Subscribes the active watcher, if any.
    pub fn depend(&self) {
        if let Some(watcher) = tracking::active() {
            watcher.add_dep(self);
        }
    }

    /// Append `watcher` unless it is already subscribed.
    pub(crate) fn add(&self, watcher: &Rc<WatcherInner>) {
        let mut subs = self.inner.subscribers.borrow_mut();
        let already = subs
            .iter()
            .any(|w| std::ptr::eq(w.as_ptr(), Rc::as_ptr(watcher)));
        if !already {
            subs.push(Rc::downgrade(watcher));
        }
    }

    pub(crate) fn remove(&self, watcher: &WatcherInner) {
        self.inner
            .subscribers
            .borrow_mut()
            .retain(|w| !std::ptr::eq(w.as_ptr(), watcher));
    }

    /// Update every subscriber in subscription order.
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] listing every subscriber whose update failed.
    /// The remaining subscribers were still updated.
    pub fn notify(&self) -> Result<(), NotifyError> {
        // Snapshot first: updates re-subscribe and may add to this list.
        let snapshot: Vec<Rc<WatcherInner>> = {
            let mut subs = self.inner.subscribers.borrow_mut();
            subs.retain(|w| w.strong_count() > 0);
            subs.iter().filter_map(Weak::upgrade).collect()
        };
        trace!(dep = %self.inner.id, subscribers = snapshot.len(), "notify");

        let mut failures = Vec::new();
        for watcher in snapshot {
            if let Err(error) = watcher.update() {
                failures.push(UpdateFailure {
                    expression: watcher.expression().to_owned(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError { failures })
        }
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .borrow()
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriber_count() == 0
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use crate::watcher::Watcher;
    use crate::Value;
    use serde_json::json;
    use std::cell::RefCell;

    fn data() -> Object {
        Object::from_json(json!({"a": 1, "b": 2})).expect("object")
    }

    #[test]
    fn depend_outside_evaluation_is_noop() {
        let dep = Dep::new();
        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Dep::new().id(), Dep::new().id());
    }

    #[test]
    fn add_ignores_duplicates() {
        let data = data();
        let w = Watcher::new(&data, "a", |_| Ok(())).expect("watcher");
        let dep = Dep::new();
        dep.add(&w.inner_rc());
        dep.add(&w.inner_rc());
        assert_eq!(dep.subscriber_count(), 1);
    }

    #[test]
    fn notify_runs_in_subscription_order() {
        let data = data();
        let order = Rc::new(RefCell::new(Vec::new()));
        let watchers: Vec<Watcher> = (0..3)
            .map(|i| {
                let order = Rc::clone(&order);
                Watcher::new(&data, "a", move |_| {
                    order.borrow_mut().push(i);
                    Ok(())
                })
                .expect("watcher")
            })
            .collect();

        data.set("a", Value::from(5)).expect("set");
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        drop(watchers);
    }

    #[test]
    fn dropped_watchers_are_pruned() {
        let data = data();
        let w = Watcher::new(&data, "a", |_| Ok(())).expect("watcher");
        assert_eq!(data.subscriber_count("a"), 1);
        drop(w);
        assert_eq!(data.subscriber_count("a"), 0);
        data.set("a", Value::from(9)).expect("set after drop");
    }

    #[test]
    fn notify_continues_after_failure() {
        let data = Object::from_json(json!({"a": {"x": 1}, "b": 1})).expect("object");
        let hits = Rc::new(RefCell::new(0));

        // Breaks once `a` stops being an object.
        let failing = Watcher::new(&data, "a.x", |_| Ok(())).expect("failing");
        let h = Rc::clone(&hits);
        let healthy = Watcher::new(&data, "a", move |_| {
            *h.borrow_mut() += 1;
            Ok(())
        })
        .expect("healthy");

        let err = data.set("a", Value::from(3)).expect_err("update must fail");
        let crate::ReactiveError::Notify(notify) = err else {
            panic!("expected notify error, got {err:?}");
        };
        assert_eq!(notify.failures.len(), 1);
        assert_eq!(notify.failures[0].expression, "a.x");
        assert_eq!(*hits.borrow(), 1, "healthy subscriber still ran");
        drop((failing, healthy));
    }
}
