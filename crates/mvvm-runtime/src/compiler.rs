#![forbid(unsafe_code)]

//! Template compilation.
//!
//! # Architecture
//!
//! ```text
//! root ──move children──▶ fragment ──walk + bind──▶ fragment ──append──▶ root
//! ```
//!
//! The root's children are staged in an off-tree fragment so that the
//! initial value of every binding is written before anything is visible.
//! The walk is pre-order depth-first with an explicit stack. Element
//! directives are handled before the element's children are visited, so a
//! `v-html` that replaces its content also drops those children from the walk.
//!
//! Binding failures never abort the walk. Each one becomes a
//! [`CompileError`] in the output and a `warn` event.

use std::rc::Rc;

use mvvm_core::{Object, Watcher};
use mvvm_view::{Event, NodeId, NodeKind, ViewAdapter};
use tracing::{debug, debug_span, warn};

use crate::config::RuntimeConfig;
use crate::directive::{BindContext, BindingDescriptor, Directive};
use crate::error::{CompileError, VmError};
use crate::interpolate::Interpolator;

/// Calls named methods on behalf of `on` bindings.
pub trait MethodInvoker {
    /// Invoke `name` with the event that fired.
    ///
    /// # Errors
    ///
    /// [`VmError::MissingMethod`] when `name` is not defined, or whatever the
    /// method itself returns.
    fn invoke(&self, name: &str, event: &Event) -> Result<(), VmError>;
}

/// What one compilation produced.
#[derive(Default)]
pub struct CompileOutput {
    /// Watchers keeping the view in sync. Dropping them detaches the view.
    pub watchers: Vec<Watcher>,
    /// Bindings that could not be installed.
    pub errors: Vec<CompileError>,
    /// Number of bindings installed, including event bindings.
    pub bindings: usize,
}

/// Walks a view subtree and installs bindings against one data object.
pub struct Compiler {
    ctx: BindContext,
    prefix: String,
}

impl Compiler {
    /// # Errors
    ///
    /// Returns an error when `config` is invalid.
    pub fn new(
        adapter: Rc<dyn ViewAdapter>,
        data: Object,
        config: &RuntimeConfig,
        methods: Rc<dyn MethodInvoker>,
    ) -> Result<Self, VmError> {
        config.validate()?;
        let interpolator = Interpolator::new(&config.delimiters.open, &config.delimiters.close)?;
        Ok(Self {
            ctx: BindContext {
                adapter,
                data,
                interpolator: Rc::new(interpolator),
                input_event: config.input_event.clone(),
                methods,
            },
            prefix: config.directive_prefix.clone(),
        })
    }

    /// Compile the subtree under `root`.
    pub fn compile(&self, root: NodeId) -> CompileOutput {
        let span = debug_span!("compile", root = %root);
        let _guard = span.enter();

        let adapter = &self.ctx.adapter;
        if !adapter.contains(root) {
            warn!("root node does not exist; nothing compiled");
            return CompileOutput::default();
        }
        let fragment = adapter.create_fragment();
        for child in adapter.children(root) {
            adapter.append_child(fragment, child);
        }

        let mut out = CompileOutput::default();
        let mut stack: Vec<NodeId> = adapter.children(fragment).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            match adapter.kind(node) {
                NodeKind::Element => {
                    self.compile_element(node, &mut out);
                    stack.extend(adapter.children(node).into_iter().rev());
                }
                NodeKind::Text => self.compile_text(node, &mut out),
                NodeKind::Fragment | NodeKind::Other => {}
            }
        }

        adapter.append_child(root, fragment);
        debug!(
            bindings = out.bindings,
            watchers = out.watchers.len(),
            errors = out.errors.len(),
            "compiled view"
        );
        out
    }

    fn compile_element(&self, node: NodeId, out: &mut CompileOutput) {
        for attr in self.ctx.adapter.attributes(node) {
            match BindingDescriptor::parse(&self.prefix, &attr, node) {
                None => {}
                Some(Ok(desc)) => self.install(&desc, out),
                Some(Err(err)) => record(err, out),
            }
        }
    }

    fn compile_text(&self, node: NodeId, out: &mut CompileOutput) {
        let text = self.ctx.adapter.text(node);
        if !self.ctx.interpolator.has_markers(&text) {
            return;
        }
        let desc = BindingDescriptor {
            node,
            directive: Directive::Text,
            event: None,
            expression: text,
        };
        self.install(&desc, out);
    }

    fn install(&self, desc: &BindingDescriptor, out: &mut CompileOutput) {
        match self.ctx.bind(desc) {
            Ok(watchers) => {
                out.bindings += 1;
                out.watchers.extend(watchers);
            }
            Err(err) => record(err, out),
        }
    }
}

fn record(err: CompileError, out: &mut CompileOutput) {
    warn!(node = %err.node(), error = %err, "binding skipped");
    out.errors.push(err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use mvvm_view::Document;
    use serde_json::json;
    use std::cell::RefCell;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
    }

    impl MethodInvoker for Recorder {
        fn invoke(&self, name: &str, event: &Event) -> Result<(), VmError> {
            self.calls.borrow_mut().push(format!("{name}:{}", event.name));
            Ok(())
        }
    }

    fn compiler(doc: &Rc<Document>, data: serde_json::Value) -> (Compiler, Rc<Recorder>) {
        let recorder = Rc::new(Recorder::default());
        let compiler = Compiler::new(
            Rc::clone(doc) as Rc<dyn ViewAdapter>,
            Object::from_json(data).expect("object"),
            &RuntimeConfig::default(),
            Rc::clone(&recorder) as Rc<dyn MethodInvoker>,
        )
        .expect("compiler");
        (compiler, recorder)
    }

    #[test]
    fn initial_render_happens_off_tree() {
        let doc = Rc::new(Document::new());
        let root = doc.append(doc.root(), doc.element("div", &[("id", "app")]));
        let input = doc.append(root, doc.element("input", &[("v-model", "name")]));
        let p = doc.append(root, doc.element("p", &[]));
        let text = doc.append(p, doc.text_node("hi {{ name }}"));

        let (compiler, _) = compiler(&doc, json!({"name": "x"}));
        let out = compiler.compile(root);

        assert_eq!(out.bindings, 2);
        assert_eq!(out.watchers.len(), 2);
        assert!(out.errors.is_empty());
        assert_eq!(doc.live_update_count(), 0);
        assert_eq!(doc.value(input), "x");
        assert_eq!(doc.text(text), "hi x");
        assert_eq!(doc.children(root), vec![input, p]);
        assert!(doc.is_connected(text));
    }

    #[test]
    fn unknown_root_compiles_nothing() {
        let doc = Rc::new(Document::new());
        let (compiler, _) = compiler(&doc, json!({}));
        let out = compiler.compile(NodeId(4242));
        assert_eq!(out.bindings, 0);
        assert!(out.watchers.is_empty());
        assert!(out.errors.is_empty());
    }

    #[test]
    fn updates_after_compile_are_live() {
        let doc = Rc::new(Document::new());
        let root = doc.append(doc.root(), doc.element("div", &[]));
        let text = doc.append(root, doc.text_node("{{ n }}"));
        let (compiler, _) = compiler(&doc, json!({"n": 1}));
        let out = compiler.compile(root);

        compiler.ctx.data.set("n", 2.into()).expect("set");
        assert_eq!(doc.text(text), "2");
        assert_eq!(doc.live_update_count(), 1);
        drop(out);
    }

    #[traced_test]
    #[test]
    fn unknown_directive_is_reported_and_siblings_still_bind() {
        let doc = Rc::new(Document::new());
        let root = doc.append(doc.root(), doc.element("div", &[]));
        let odd = doc.append(root, doc.element("span", &[("v-show", "flag"), ("v-html", "body")]));
        let sibling = doc.append(root, doc.element("div", &[("v-html", "body")]));

        let (compiler, _) = compiler(&doc, json!({"body": "<em>ok</em>", "flag": true}));
        let out = compiler.compile(root);

        assert_eq!(out.errors.len(), 1);
        let CompileError::UnknownDirective { directive, node, .. } = &out.errors[0] else {
            panic!("expected an unknown directive, got {:?}", out.errors[0]);
        };
        assert_eq!(directive, "show");
        assert_eq!(*node, odd);
        assert_eq!(doc.inner_html(odd).as_deref(), Some("<em>ok</em>"));
        assert_eq!(doc.inner_html(sibling).as_deref(), Some("<em>ok</em>"));
        assert!(logs_contain("binding skipped"));
    }

    #[test]
    fn path_errors_skip_only_that_binding() {
        let doc = Rc::new(Document::new());
        let root = doc.append(doc.root(), doc.element("div", &[]));
        let bad = doc.append(root, doc.text_node("{{ count.value }}"));
        let good = doc.append(root, doc.text_node("{{ count }}"));

        let (compiler, _) = compiler(&doc, json!({"count": 3}));
        let out = compiler.compile(root);

        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].node(), bad);
        assert_eq!(doc.text(bad), "{{ count.value }}");
        assert_eq!(doc.text(good), "3");
    }

    #[test]
    fn event_bindings_reach_the_invoker() {
        let doc = Rc::new(Document::new());
        let root = doc.append(doc.root(), doc.element("div", &[]));
        let button = doc.append(root, doc.element("button", &[("v-on:click", "save")]));

        let (compiler, recorder) = compiler(&doc, json!({}));
        let out = compiler.compile(root);
        assert_eq!(out.bindings, 1);
        assert!(out.watchers.is_empty());

        doc.dispatch(button, "click").expect("dispatch");
        assert_eq!(*recorder.calls.borrow(), vec!["save:click".to_owned()]);
    }

    #[test]
    fn nested_elements_are_walked_in_document_order() {
        let doc = Rc::new(Document::new());
        let root = doc.append(doc.root(), doc.element("div", &[]));
        let outer = doc.append(root, doc.element("section", &[]));
        let inner = doc.append(outer, doc.element("p", &[]));
        let deep = doc.append(inner, doc.text_node("{{ a }}-{{ b }}"));
        let comment = doc.append(root, doc.comment("{{ a }}"));

        let (compiler, _) = compiler(&doc, json!({"a": 1, "b": 2}));
        let out = compiler.compile(root);

        assert_eq!(doc.text(deep), "1-2");
        assert_eq!(out.watchers.len(), 2);
        assert_eq!(doc.text(comment), "{{ a }}");
    }

    #[test]
    fn custom_prefix_and_delimiters() {
        let doc = Rc::new(Document::new());
        let root = doc.append(doc.root(), doc.element("div", &[]));
        let div = doc.append(root, doc.element("div", &[("x-html", "a"), ("v-html", "a")]));
        let text = doc.append(root, doc.text_node("[[ a ]] {{ a }}"));

        let config = RuntimeConfig {
            directive_prefix: "x-".into(),
            delimiters: crate::config::Delimiters {
                open: "[[".into(),
                close: "]]".into(),
            },
            ..RuntimeConfig::default()
        };
        let compiler = Compiler::new(
            Rc::clone(&doc) as Rc<dyn ViewAdapter>,
            Object::from_json(json!({"a": "A"})).expect("object"),
            &config,
            Rc::new(Recorder::default()),
        )
        .expect("compiler");
        let out = compiler.compile(root);

        assert!(out.errors.is_empty());
        assert_eq!(out.bindings, 2);
        assert_eq!(doc.inner_html(div).as_deref(), Some("A"));
        assert_eq!(doc.text(text), "A {{ a }}");
    }
}
