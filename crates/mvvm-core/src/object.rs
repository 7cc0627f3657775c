#![forbid(unsafe_code)]

//! Reactive objects: a tree of property cells built once at wrap time.
//!
//! Each data property is a cell holding a [`Value`] and its own [`Dep`].
//! Reading through [`Object::get`] subscribes the active watcher to the
//! property; writing through [`Object::set`] replaces the value and notifies
//! the property's subscribers when the new value is not strictly equal to the
//! old one.
//!
//! Reactivity is per property, not per path: replacing a nested object only
//! notifies the subscribers of the replaced property.
//!
//! Computed properties live beside data properties. They run their
//! derivation on every read and have no `Dep` of their own; the reads the
//! derivation makes are attributed to whichever watcher is evaluating.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::Result;
use crate::dep::Dep;
use crate::error::ReactiveError;
use crate::value::Value;

/// Derivation backing a computed property. Receives the object it is
/// defined on.
pub type ComputedFn = Rc<dyn Fn(&Object) -> Result<Value>>;

enum Slot {
    Data { value: RefCell<Value>, dep: Dep },
    Computed(ComputedFn),
}

#[derive(Default)]
struct Props {
    /// Insertion-ordered slots.
    entries: Vec<(Rc<str>, Rc<Slot>)>,
    index: AHashMap<Rc<str>, usize>,
}

impl Props {
    fn slot(&self, key: &str) -> Option<Rc<Slot>> {
        self.index.get(key).map(|&i| Rc::clone(&self.entries[i].1))
    }

    fn insert(&mut self, key: &str, slot: Slot) {
        let slot = Rc::new(slot);
        if let Some(&i) = self.index.get(key) {
            self.entries[i].1 = slot;
        } else {
            let key: Rc<str> = Rc::from(key);
            self.index.insert(Rc::clone(&key), self.entries.len());
            self.entries.push((key, slot));
        }
    }
}

/// A reactive object.
///
/// Cloning an `Object` yields another handle to the same properties.
#[derive(Clone, Default)]
pub struct Object {
    props: Rc<RefCell<Props>>,
}

impl Object {
    /// An empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap plain JSON. Returns `None` when `json` is not an object.
    #[must_use]
    pub fn from_json(json: serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Object(map) => Some(Self::from_json_map(map)),
            _ => None,
        }
    }

    pub(crate) fn from_json_map(map: serde_json::Map<String, serde_json::Value>) -> Self {
        let obj = Self::new();
        {
            let mut props = obj.props.borrow_mut();
            for (key, value) in map {
                props.insert(&key, data_slot(Value::from(value)));
            }
        }
        obj
    }

    /// Tracked read.
    ///
    /// Subscribes the active watcher to `key`. Missing keys read as
    /// [`Value::Undefined`].
    ///
    /// # Errors
    ///
    /// Only computed properties can fail; their error is returned as is.
    pub fn get(&self, key: &str) -> Result<Value> {
        let slot = self.props.borrow().slot(key);
        match slot.as_deref() {
            None => Ok(Value::Undefined),
            Some(Slot::Data { value, dep }) => {
                dep.depend();
                Ok(value.borrow().clone())
            }
            Some(Slot::Computed(compute)) => compute(self),
        }
    }

    /// Untracked read of a data property. Computed properties read as
    /// [`Value::Undefined`].
    #[must_use]
    pub fn peek(&self, key: &str) -> Value {
        let slot = self.props.borrow().slot(key);
        match slot.as_deref() {
            Some(Slot::Data { value, .. }) => value.borrow().clone(),
            _ => Value::Undefined,
        }
    }

    /// Write `value` to `key`.
    ///
    /// A strictly equal value is ignored. Otherwise the value replaces the
    /// old one and the property's subscribers are notified before this call
    /// returns. A key that does not exist yet becomes a new reactive property.
    ///
    /// # Errors
    ///
    /// - [`ReactiveError::ReadOnly`] when `key` is a computed property.
    /// - [`ReactiveError::Notify`] when subscribers failed to update. The
    ///   write itself has happened.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let slot = self.props.borrow().slot(key);
        match slot.as_deref() {
            None => {
                self.props.borrow_mut().insert(key, data_slot(value));
                Ok(())
            }
            Some(Slot::Computed(_)) => Err(ReactiveError::ReadOnly { key: key.to_owned() }),
            Some(Slot::Data { value: cell, dep }) => {
                if cell.borrow().strict_eq(&value) {
                    return Ok(());
                }
                *cell.borrow_mut() = value;
                dep.notify()?;
                Ok(())
            }
        }
    }

    /// Define (or replace) a computed property.
    pub fn define_computed(
        &self,
        key: &str,
        compute: impl Fn(&Object) -> Result<Value> + 'static,
    ) {
        self.props
            .borrow_mut()
            .insert(key, Slot::Computed(Rc::new(compute)));
    }

    /// Whether `key` is a computed property.
    #[must_use]
    pub fn is_computed(&self, key: &str) -> bool {
        matches!(
            self.props.borrow().slot(key).as_deref(),
            Some(Slot::Computed(_))
        )
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.props.borrow().index.contains_key(key)
    }

    /// Property names in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.props
            .borrow()
            .entries
            .iter()
            .map(|(k, _)| k.to_string())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.props.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `Dep` behind a data property.
    #[must_use]
    pub fn dep(&self, key: &str) -> Option<Dep> {
        match self.props.borrow().slot(key).as_deref() {
            Some(Slot::Data { dep, .. }) => Some(dep.clone()),
            _ => None,
        }
    }

    /// Live subscribers of a data property (0 for missing or computed keys).
    #[must_use]
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.dep(key).map_or(0, |dep| dep.subscriber_count())
    }

    /// Whether both handles point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.props, &other.props)
    }

    /// Untracked snapshot as plain JSON, computed properties included.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        crate::tracking::untracked(|| {
            let entries: Vec<(Rc<str>, Rc<Slot>)> = self.props.borrow().entries.clone();
            let map = entries
                .into_iter()
                .map(|(key, slot)| {
                    let value = match &*slot {
                        Slot::Data { value, .. } => value.borrow().to_json(),
                        Slot::Computed(compute) => compute(self)
                            .map(|v| v.to_json())
                            .unwrap_or(serde_json::Value::Null),
                    };
                    (key.to_string(), value)
                })
                .collect();
            serde_json::Value::Object(map)
        })
    }
}

fn data_slot(value: Value) -> Slot {
    Slot::Data {
        value: RefCell::new(value),
        dep: Dep::new(),
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = self.props.borrow();
        let mut map = f.debug_map();
        for (key, slot) in &props.entries {
            match &**slot {
                Slot::Data { value, .. } => map.entry(key, &*value.borrow()),
                Slot::Computed(_) => map.entry(key, &"<computed>"),
            };
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::Watcher;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn missing_key_reads_undefined() {
        let obj = Object::new();
        assert!(obj.get("nope").expect("get").is_undefined());
    }

    #[test]
    fn keys_keep_insertion_order() {
        let obj = Object::new();
        for key in ["b", "a", "c"] {
            obj.set(key, 1.into()).expect("insert");
        }
        obj.set("a", 2.into()).expect("overwrite");
        assert_eq!(obj.keys(), ["b", "a", "c"]);
    }

    #[test]
    fn set_inserts_missing_property_reactively() {
        let obj = Object::new();
        obj.set("fresh", "v".into()).expect("insert");
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _w = Watcher::new(&obj, "fresh", move |_| {
            h.set(h.get() + 1);
            Ok(())
        })
        .expect("watcher");
        obj.set("fresh", "w".into()).expect("set");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn assigned_json_becomes_reactive() {
        let obj = Object::from_json(json!({"user": null})).expect("object");
        obj.set("user", json!({"name": "n"}).into()).expect("set");
        let user = obj.peek("user");
        let user = user.as_object().expect("wrapped");
        assert!(user.dep("name").is_some());
    }

    #[test]
    fn computed_runs_on_every_read() {
        let obj = Object::from_json(json!({"first": "Ada", "last": "L"})).expect("object");
        let runs = Rc::new(Cell::new(0));
        let r = Rc::clone(&runs);
        obj.define_computed("full", move |o| {
            r.set(r.get() + 1);
            Ok(format!("{} {}", o.get("first")?, o.get("last")?).into())
        });

        assert_eq!(obj.get("full").expect("full").to_string(), "Ada L");
        assert_eq!(obj.get("full").expect("full").to_string(), "Ada L");
        assert_eq!(runs.get(), 2);
        assert!(obj.is_computed("full"));
        assert!(obj.peek("full").is_undefined());
    }

    #[test]
    fn computed_inputs_are_tracked_by_outer_watcher() {
        let obj = Object::from_json(json!({"first": "Ada", "last": "L"})).expect("object");
        obj.define_computed("full", |o| {
            Ok(format!("{} {}", o.get("first")?, o.get("last")?).into())
        });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _w = Watcher::new(&obj, "full", move |v| {
            s.borrow_mut().push(v.to_string());
            Ok(())
        })
        .expect("watcher");

        assert_eq!(obj.subscriber_count("first"), 1);
        assert_eq!(obj.subscriber_count("last"), 1);
        obj.set("last", "Lovelace".into()).expect("set");
        assert_eq!(*seen.borrow(), vec!["Ada Lovelace"]);
    }

    #[test]
    fn computed_is_read_only() {
        let obj = Object::new();
        obj.define_computed("c", |_| Ok(Value::Null));
        let err = obj.set("c", 1.into()).expect_err("read only");
        assert_eq!(err, ReactiveError::ReadOnly { key: "c".into() });
    }

    #[test]
    fn to_json_includes_computed() {
        let obj = Object::from_json(json!({"n": 2.0})).expect("object");
        obj.define_computed("double", |o| {
            Ok(Value::from(o.get("n")?.as_f64().unwrap_or(0.0) * 2.0))
        });
        assert_eq!(obj.to_json(), json!({"n": 2.0, "double": 4.0}));
    }

    #[test]
    fn debug_lists_properties() {
        let obj = Object::from_json(json!({"a": "x"})).expect("object");
        obj.define_computed("c", |_| Ok(Value::Null));
        let debug = format!("{obj:?}");
        assert!(debug.contains("\"a\": String(\"x\")"));
        assert!(debug.contains("<computed>"));
    }
}
