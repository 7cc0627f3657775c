#![forbid(unsafe_code)]

//! Watchers: one dotted expression, its last value, and a change callback.
//!
//! A [`Watcher`] evaluates its expression once on construction. That first
//! evaluation both captures the initial value and subscribes the watcher to
//! every property the expression reads. When one of those properties changes,
//! the property's [`Dep`] calls [`Watcher::update`], which re-evaluates and
//! invokes the callback only if the result is not strictly equal to the last
//! value.
//!
//! # Invariants
//!
//! 1. After every evaluation the watcher is subscribed to exactly the deps it
//!    read during that evaluation. Deps it no longer reads drop it.
//! 2. The callback never runs for a value strictly equal to the last one.
//! 3. The callback runs outside any tracking scope.
//!
//! # Failure Modes
//!
//! - Resolution failure: returned from `new` / `update`; `last_value` is left
//!   unchanged and the deps read before the failure stay subscribed, so a
//!   later fix to the data re-triggers the watcher.
//! - Callback failure: returned from `update`; `last_value` already holds the
//!   new value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashSet;
use tracing::trace;

use crate::Result;
use crate::dep::{Dep, DepId};
use crate::object::Object;
use crate::path;
use crate::tracking::{self, TrackingScope};
use crate::value::Value;

/// Change callback invoked with the newly evaluated value.
pub type Callback = Box<dyn Fn(&Value) -> Result<()>>;

#[derive(Default)]
struct DepSet {
    deps: Vec<Dep>,
    ids: AHashSet<DepId>,
}

impl DepSet {
    fn insert(&mut self, dep: &Dep) -> bool {
        if self.ids.insert(dep.id()) {
            self.deps.push(dep.clone());
            true
        } else {
            false
        }
    }

    fn contains(&self, id: DepId) -> bool {
        self.ids.contains(&id)
    }
}

pub(crate) struct WatcherInner {
    root: Object,
    expression: Rc<str>,
    callback: Callback,
    last_value: RefCell<Value>,
    /// Deps read during the last completed evaluation.
    deps: RefCell<DepSet>,
    /// Deps read so far during the evaluation in progress.
    pending: RefCell<DepSet>,
}

impl WatcherInner {
    pub(crate) fn expression(&self) -> &str {
        &self.expression
    }

    /// Record a read made while this watcher is active.
    pub(crate) fn add_dep(self: &Rc<Self>, dep: &Dep) {
        if self.pending.borrow_mut().insert(dep) && !self.deps.borrow().contains(dep.id()) {
            dep.add(self);
        }
    }

    fn evaluate(self: &Rc<Self>) -> Result<Value> {
        *self.pending.borrow_mut() = DepSet::default();
        let result = {
            let _scope = TrackingScope::enter(Rc::clone(self));
            path::resolve(&self.root, &self.expression)
        };
        self.cleanup_deps();
        result
    }

    /// Swap in the deps read by the last evaluation, unsubscribing from the
    /// ones it did not read.
    fn cleanup_deps(&self) {
        let fresh = std::mem::take(&mut *self.pending.borrow_mut());
        let stale = std::mem::replace(&mut *self.deps.borrow_mut(), fresh);
        let current = self.deps.borrow();
        for dep in stale.deps.iter().filter(|d| !current.contains(d.id())) {
            dep.remove(self);
        }
    }

    pub(crate) fn update(self: &Rc<Self>) -> Result<()> {
        let value = self.evaluate()?;
        let changed = !value.strict_eq(&self.last_value.borrow());
        if !changed {
            return Ok(());
        }
        trace!(expression = %self.expression, "watcher value changed");
        *self.last_value.borrow_mut() = value.clone();
        tracking::untracked(|| (self.callback)(&value))
    }
}

/// Evaluates one expression against a store and reacts to its changes.
///
/// The watcher stays subscribed for as long as a `Watcher` handle (or a clone)
/// is alive. Dropping the last handle silently detaches it.
#[derive(Clone)]
pub struct Watcher {
    inner: Rc<WatcherInner>,
}

impl Watcher {
    /// Create a watcher over `expression` and evaluate it once.
    ///
    /// # Errors
    ///
    /// Returns the resolution error of the initial evaluation. No watcher is
    /// created in that case.
    pub fn new(
        root: &Object,
        expression: &str,
        callback: impl Fn(&Value) -> Result<()> + 'static,
    ) -> Result<Self> {
        let inner = Rc::new(WatcherInner {
            root: root.clone(),
            expression: Rc::from(expression.trim()),
            callback: Box::new(callback),
            last_value: RefCell::new(Value::Undefined),
            deps: RefCell::new(DepSet::default()),
            pending: RefCell::new(DepSet::default()),
        });
        let initial = inner.evaluate()?;
        *inner.last_value.borrow_mut() = initial;
        Ok(Self { inner })
    }

    /// Evaluate without comparing or calling back. Subscriptions are refreshed.
    ///
    /// # Errors
    ///
    /// Returns the resolution error, if any.
    pub fn evaluate(&self) -> Result<Value> {
        self.inner.evaluate()
    }

    /// Re-evaluate and invoke the callback if the value changed.
    ///
    /// # Errors
    ///
    /// Returns a resolution or callback error.
    pub fn update(&self) -> Result<()> {
        self.inner.update()
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        &self.inner.expression
    }

    /// Value produced by the last successful evaluation that changed it.
    #[must_use]
    pub fn last_value(&self) -> Value {
        self.inner.last_value.borrow().clone()
    }

    /// Ids of the deps this watcher is subscribed to.
    #[must_use]
    pub fn dep_ids(&self) -> Vec<DepId> {
        self.inner.deps.borrow().deps.iter().map(Dep::id).collect()
    }

    pub(crate) fn inner_rc(&self) -> Rc<WatcherInner> {
        Rc::clone(&self.inner)
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("expression", &self.inner.expression)
            .field("last_value", &self.inner.last_value.borrow())
            .field("deps", &self.inner.deps.borrow().deps.len())
            .finish()
    }
}
