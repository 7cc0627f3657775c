#![forbid(unsafe_code)]

//! The session object.
//!
//! A [`Vm`] owns one reactive data object, the session's methods, and the
//! watchers its compiled view needs. Build one from [`VmOptions`]:
//!
//! ```ignore
//! let doc = Rc::new(Document::new());
//! let vm = Vm::new(
//!     VmOptions::new()
//!         .el("#app")
//!         .data(json!({"name": "x"}))
//!         .method("clear", |vm, _event| vm.set("name", "".into())),
//!     doc,
//! )?;
//! vm.set("name", "y".into())?;
//! ```
//!
//! Data paths are read and written through the session (`vm.get`,
//! `vm.set`), which proxy to the data object. Dropping the session drops
//! its watchers, after which data writes no longer reach the view.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use mvvm_core::{ComputedFn, Object, Value, Watcher, assign, resolve};
use mvvm_view::{Event, NodeId, ViewAdapter};
use tracing::{debug, info_span};

use crate::compiler::{Compiler, MethodInvoker};
use crate::config::RuntimeConfig;
use crate::error::{CompileError, VmError};

/// A session method, invoked by `on` bindings.
pub type Method = Rc<dyn Fn(&Vm, &Event) -> Result<(), VmError>>;

/// Where the view to compile lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewRoot {
    Node(NodeId),
    /// Looked up with [`ViewAdapter::query`].
    Selector(String),
}

impl fmt::Display for ViewRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => write!(f, "node {node}"),
            Self::Selector(selector) => write!(f, "`{selector}`"),
        }
    }
}

impl From<NodeId> for ViewRoot {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for ViewRoot {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_owned())
    }
}

impl From<String> for ViewRoot {
    fn from(selector: String) -> Self {
        Self::Selector(selector)
    }
}

/// Builder for a [`Vm`].
pub struct VmOptions {
    el: Option<ViewRoot>,
    data: Value,
    computed: Vec<(String, ComputedFn)>,
    methods: Vec<(String, Method)>,
    config: RuntimeConfig,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            el: None,
            data: Value::Object(Object::new()),
            computed: Vec::new(),
            methods: Vec::new(),
            config: RuntimeConfig::default(),
        }
    }
}

impl VmOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// View root to compile. Without one, no view is compiled.
    #[must_use]
    pub fn el(mut self, root: impl Into<ViewRoot>) -> Self {
        self.el = Some(root.into());
        self
    }

    /// Initial data. Must convert to an object.
    #[must_use]
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    /// Define a derived property, recomputed on every read.
    #[must_use]
    pub fn computed(
        mut self,
        name: impl Into<String>,
        compute: impl Fn(&Object) -> mvvm_core::Result<Value> + 'static,
    ) -> Self {
        let compute: ComputedFn = Rc::new(compute);
        self.computed.push((name.into(), compute));
        self
    }

    #[must_use]
    pub fn method(
        mut self,
        name: impl Into<String>,
        method: impl Fn(&Vm, &Event) -> Result<(), VmError> + 'static,
    ) -> Self {
        let method: Method = Rc::new(method);
        self.methods.push((name.into(), method));
        self
    }

    #[must_use]
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }
}

struct VmInner {
    adapter: Rc<dyn ViewAdapter>,
    data: Object,
    methods: AHashMap<String, Method>,
    el: Option<NodeId>,
    config: RuntimeConfig,
    watchers: RefCell<Vec<Watcher>>,
    compile_errors: RefCell<Vec<CompileError>>,
}

/// A data-bound session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct Vm {
    inner: Rc<VmInner>,
}

/// Routes `on` bindings back to a live session without keeping it alive.
struct SessionMethods(Weak<VmInner>);

impl MethodInvoker for SessionMethods {
    fn invoke(&self, name: &str, event: &Event) -> Result<(), VmError> {
        let inner = self.0.upgrade().ok_or(VmError::SessionDropped)?;
        Vm { inner }.call_method(name, event)
    }
}

impl Vm {
    /// Build a session: make the data reactive, define computed properties,
    /// then compile the view root if one was given.
    ///
    /// # Errors
    ///
    /// - [`VmError::Config`] for an invalid config.
    /// - [`VmError::DataNotObject`] when the data is not an object.
    /// - [`VmError::RootNotFound`] when a selector matches nothing or the
    ///   root node does not exist in `adapter`.
    ///
    /// Binding failures inside the view do not fail construction; see
    /// [`Vm::compile_errors`].
    pub fn new(options: VmOptions, adapter: Rc<dyn ViewAdapter>) -> Result<Self, VmError> {
        let VmOptions {
            el,
            data,
            computed,
            methods,
            config,
        } = options;
        config.validate()?;

        let data = match data {
            Value::Object(obj) => obj,
            other => {
                return Err(VmError::DataNotObject {
                    found: other.type_name(),
                });
            }
        };
        for (name, compute) in computed {
            data.define_computed(&name, move |obj| compute(obj));
        }

        let el = match el {
            None => None,
            Some(ViewRoot::Node(node)) if adapter.contains(node) => Some(node),
            Some(root @ ViewRoot::Node(_)) => return Err(VmError::RootNotFound { root }),
            Some(ViewRoot::Selector(selector)) => match adapter.query(&selector) {
                Some(node) => Some(node),
                None => {
                    return Err(VmError::RootNotFound {
                        root: ViewRoot::Selector(selector),
                    });
                }
            },
        };

        let vm = Self {
            inner: Rc::new(VmInner {
                adapter,
                data,
                methods: methods.into_iter().collect(),
                el,
                config,
                watchers: RefCell::new(Vec::new()),
                compile_errors: RefCell::new(Vec::new()),
            }),
        };
        if let Some(root) = el {
            vm.compile(root)?;
        } else {
            debug!("no view root; skipping compile");
        }
        Ok(vm)
    }

    fn compile(&self, root: NodeId) -> Result<(), VmError> {
        let span = info_span!("vm", root = %root);
        let _guard = span.enter();
        let compiler = Compiler::new(
            Rc::clone(&self.inner.adapter),
            self.inner.data.clone(),
            &self.inner.config,
            Rc::new(SessionMethods(Rc::downgrade(&self.inner))),
        )?;
        let out = compiler.compile(root);
        self.inner.watchers.borrow_mut().extend(out.watchers);
        self.inner.compile_errors.borrow_mut().extend(out.errors);
        Ok(())
    }

    /// Read a data path. Tracked like any other read.
    ///
    /// # Errors
    ///
    /// Returns the resolution error.
    pub fn get(&self, path: &str) -> mvvm_core::Result<Value> {
        resolve(&self.inner.data, path)
    }

    /// Write a data path. Bound nodes are updated before this returns.
    ///
    /// # Errors
    ///
    /// Returns the resolution error, or the update failures of bindings
    /// that could not re-evaluate.
    pub fn set(&self, path: &str, value: Value) -> mvvm_core::Result<()> {
        assign(&self.inner.data, path, value)
    }

    /// The reactive data object.
    #[must_use]
    pub fn data(&self) -> &Object {
        &self.inner.data
    }

    #[must_use]
    pub fn el(&self) -> Option<NodeId> {
        self.inner.el
    }

    #[must_use]
    pub fn adapter(&self) -> &Rc<dyn ViewAdapter> {
        &self.inner.adapter
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<Method> {
        self.inner.methods.get(name).cloned()
    }

    /// Invoke a method by name.
    ///
    /// # Errors
    ///
    /// [`VmError::MissingMethod`] when `name` is not defined, otherwise
    /// whatever the method returns.
    pub fn call_method(&self, name: &str, event: &Event) -> Result<(), VmError> {
        let method = self.method(name).ok_or_else(|| VmError::MissingMethod {
            name: name.to_owned(),
        })?;
        method(self, event)
    }

    /// Bindings that could not be installed during compilation.
    #[must_use]
    pub fn compile_errors(&self) -> Vec<CompileError> {
        self.inner.compile_errors.borrow().clone()
    }

    /// Number of live watchers owned by the session.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vm")
            .field("el", &self.inner.el)
            .field("data", &self.inner.data)
            .field("methods", &self.inner.methods.keys().collect::<Vec<_>>())
            .field("watchers", &self.watcher_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvvm_view::Document;
    use serde_json::json;
    use std::cell::Cell;

    fn adapter(doc: &Rc<Document>) -> Rc<dyn ViewAdapter> {
        Rc::clone(doc) as Rc<dyn ViewAdapter>
    }

    #[test]
    fn data_must_be_an_object() {
        let doc = Rc::new(Document::new());
        let err = Vm::new(VmOptions::new().data(json!([1, 2])), adapter(&doc)).expect_err("list");
        assert!(matches!(err, VmError::DataNotObject { found: "list" }));
    }

    #[test]
    fn missing_root_selector_is_an_error() {
        let doc = Rc::new(Document::new());
        let err = Vm::new(VmOptions::new().el("#nowhere"), adapter(&doc)).expect_err("no root");
        let expected = ViewRoot::from("#nowhere");
        assert!(matches!(&err, VmError::RootNotFound { root } if *root == expected));
        assert_eq!(err.to_string(), "view root `#nowhere` not found");
    }

    #[test]
    fn unknown_root_node_is_an_error() {
        let doc = Rc::new(Document::new());
        let err = Vm::new(
            VmOptions::new().el(NodeId(999)).data(json!({})),
            adapter(&doc),
        )
        .expect_err("no such node");
        assert!(matches!(err, VmError::RootNotFound { root: ViewRoot::Node(NodeId(999)) }));
        assert_eq!(err.to_string(), "view root node #999 not found");
    }

    #[test]
    fn without_root_nothing_is_compiled() {
        let doc = Rc::new(Document::new());
        let text = doc.append(doc.root(), doc.text_node("{{ a }}"));
        let vm = Vm::new(VmOptions::new().data(json!({"a": 1})), adapter(&doc)).expect("vm");
        assert_eq!(vm.watcher_count(), 0);
        assert_eq!(doc.text(text), "{{ a }}");
        assert_eq!(vm.get("a").expect("a").to_string(), "1");
    }

    #[test]
    fn get_and_set_proxy_to_data() {
        let doc = Rc::new(Document::new());
        let vm = Vm::new(
            VmOptions::new().data(json!({"school": {"name": "north"}})),
            adapter(&doc),
        )
        .expect("vm");
        vm.set("school.name", "south".into()).expect("set");
        assert_eq!(vm.get("school.name").expect("get").to_string(), "south");
        assert_eq!(vm.data().keys(), vec!["school".to_owned()]);
    }

    #[test]
    fn computed_properties_read_live_data() {
        let doc = Rc::new(Document::new());
        let vm = Vm::new(
            VmOptions::new()
                .data(json!({"first": "a", "last": "b"}))
                .computed("full", |data| {
                    Ok(format!("{} {}", data.get("first")?, data.get("last")?).into())
                }),
            adapter(&doc),
        )
        .expect("vm");
        assert_eq!(vm.get("full").expect("full").to_string(), "a b");
        vm.set("first", "c".into()).expect("set");
        assert_eq!(vm.get("full").expect("full").to_string(), "c b");
    }

    #[test]
    fn call_method_reports_missing_names() {
        let doc = Rc::new(Document::new());
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let vm = Vm::new(
            VmOptions::new().method("bump", move |_, _| {
                counter.set(counter.get() + 1);
                Ok(())
            }),
            adapter(&doc),
        )
        .expect("vm");
        let ev = Event::new("click", doc.root(), "");
        vm.call_method("bump", &ev).expect("bump");
        assert_eq!(calls.get(), 1);
        assert!(matches!(
            vm.call_method("nope", &ev),
            Err(VmError::MissingMethod { ref name }) if name == "nope"
        ));
    }

    #[test]
    fn event_after_session_drop_is_reported() {
        let doc = Rc::new(Document::new());
        let root = doc.append(doc.root(), doc.element("div", &[("id", "app")]));
        let button = doc.append(root, doc.element("button", &[("v-on:click", "noop")]));
        let vm = Vm::new(
            VmOptions::new().el("#app").method("noop", |_, _| Ok(())),
            adapter(&doc),
        )
        .expect("vm");
        doc.dispatch(button, "click").expect("live session");
        drop(vm);

        let err = doc.dispatch(button, "click").expect_err("dropped");
        assert!(matches!(err.first_as::<VmError>(), Some(VmError::SessionDropped)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let doc = Rc::new(Document::new());
        let config = RuntimeConfig {
            directive_prefix: String::new(),
            ..RuntimeConfig::default()
        };
        assert!(matches!(
            Vm::new(VmOptions::new().config(config), adapter(&doc)),
            Err(VmError::Config(_))
        ));
    }
}
