#![forbid(unsafe_code)]

//! In-memory view tree implementing [`ViewAdapter`].
//!
//! Nodes live in an arena behind a `RefCell`. A `Document` has one root
//! element (`body`); nodes created with [`Document::element`] or
//! [`Document::text_node`] start detached and join the tree through
//! [`Document::append`].
//!
//! # Invariants
//!
//! 1. A node has at most one parent, and appears once in that parent's
//!    children.
//! 2. Appending a fragment moves its children and leaves it empty.
//! 3. No arena borrow is held while listeners run, so listeners may mutate
//!    the document.
//! 4. [`Document::live_update_count`] only counts value/text/markup writes to
//!    nodes connected to the root.
//!
//! # Selectors
//!
//! [`ViewAdapter::query`] understands `#id`, `.class`, and bare tag names,
//! searching connected nodes in document order.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

use crate::adapter::{Attribute, Event, Listener, ListenerError, NodeId, NodeKind, ViewAdapter};

/// Every listener failure from one [`Document::dispatch`] call.
#[derive(Debug, Error)]
#[error("{} listener(s) failed for `{event}` on {target}", errors.len())]
pub struct DispatchError {
    pub event: String,
    pub target: NodeId,
    pub errors: Vec<ListenerError>,
}

impl DispatchError {
    /// First failure, downcast to a concrete error type.
    #[must_use]
    pub fn first_as<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.errors.first().and_then(|e| e.downcast_ref::<E>())
    }
}

struct NodeData {
    kind: NodeKind,
    tag: String,
    attrs: Vec<Attribute>,
    text: String,
    value: String,
    inner_html: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(String, Listener)>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            tag: String::new(),
            attrs: Vec::new(),
            text: String::new(),
            value: String::new(),
            inner_html: None,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

/// In-memory view tree.
pub struct Document {
    nodes: RefCell<Vec<NodeData>>,
    root: NodeId,
    live_updates: Cell<u64>,
}

impl Document {
    /// An empty document with a `body` root.
    #[must_use]
    pub fn new() -> Self {
        let mut body = NodeData::new(NodeKind::Element);
        body.tag = "body".to_owned();
        Self {
            nodes: RefCell::new(vec![body]),
            root: NodeId(0),
            live_updates: Cell::new(0),
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn push(&self, data: NodeData) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId(u32::try_from(nodes.len()).unwrap_or(u32::MAX));
        nodes.push(data);
        id
    }

    /// Create a detached element.
    pub fn element(&self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut data = NodeData::new(NodeKind::Element);
        data.tag = tag.to_owned();
        data.attrs = attrs.iter().map(|(n, v)| Attribute::new(*n, *v)).collect();
        self.push(data)
    }

    /// Create a detached text node.
    pub fn text_node(&self, text: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Text);
        data.text = text.to_owned();
        self.push(data)
    }

    /// Create a detached node the compiler should ignore.
    pub fn comment(&self, text: &str) -> NodeId {
        let mut data = NodeData::new(NodeKind::Other);
        data.text = text.to_owned();
        self.push(data)
    }

    /// Append `child` to `parent`. Alias for [`ViewAdapter::append_child`].
    pub fn append(&self, parent: NodeId, child: NodeId) -> NodeId {
        self.append_child(parent, child);
        child
    }

    #[must_use]
    pub fn tag(&self, node: NodeId) -> String {
        self.nodes.borrow()[idx(node)].tag.clone()
    }

    #[must_use]
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.borrow()[idx(node)]
            .attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.clone())
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow()[idx(node)].parent
    }

    /// Raw markup last written with `set_inner_html`.
    #[must_use]
    pub fn inner_html(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow()[idx(node)].inner_html.clone()
    }

    /// Whether `node` is reachable from the root.
    #[must_use]
    pub fn is_connected(&self, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = nodes[idx(id)].parent;
        }
        false
    }

    /// Concatenated text of `node` and its descendants.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        collect_text(&nodes, node, &mut out);
        out
    }

    /// Number of updates written to connected nodes so far.
    #[must_use]
    pub fn live_update_count(&self) -> u64 {
        self.live_updates.get()
    }

    /// Number of listeners registered on `node` for `event`.
    #[must_use]
    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.nodes.borrow()[idx(node)]
            .listeners
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }

    /// Fire `event` on `node`. Every listener runs, in registration order.
    ///
    /// Returns the number of listeners invoked.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] holding every listener failure.
    pub fn dispatch(&self, node: NodeId, event: &str) -> Result<usize, DispatchError> {
        let (listeners, value): (Vec<Listener>, String) = {
            let nodes = self.nodes.borrow();
            let data = &nodes[idx(node)];
            let listeners = data
                .listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, l)| Rc::clone(l))
                .collect();
            (listeners, data.value.clone())
        };
        trace!(event, target = %node, listeners = listeners.len(), "dispatch");

        let ev = Event::new(event, node, value);
        let errors: Vec<ListenerError> = listeners
            .iter()
            .filter_map(|listener| listener(&ev).err())
            .collect();
        if errors.is_empty() {
            Ok(listeners.len())
        } else {
            Err(DispatchError {
                event: event.to_owned(),
                target: node,
                errors,
            })
        }
    }

    /// Simulate user input: store `value` on `node`, then fire `input`.
    ///
    /// # Errors
    ///
    /// Same as [`Document::dispatch`].
    pub fn input(&self, node: NodeId, value: &str) -> Result<usize, DispatchError> {
        self.nodes.borrow_mut()[idx(node)].value = value.to_owned();
        self.dispatch(node, "input")
    }

    fn record_update(&self, node: NodeId) {
        if self.is_connected(node) {
            self.live_updates.set(self.live_updates.get() + 1);
        }
    }

    fn detach(nodes: &mut [NodeData], child: NodeId) {
        if let Some(old) = nodes[idx(child)].parent.take() {
            nodes[idx(old)].children.retain(|c| *c != child);
        }
    }

    fn find(&self, pred: impl Fn(&NodeData) -> bool) -> Option<NodeId> {
        let nodes = self.nodes.borrow();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let data = &nodes[idx(id)];
            if pred(data) {
                return Some(id);
            }
            stack.extend(data.children.iter().rev().copied());
        }
        None
    }
}

fn idx(node: NodeId) -> usize {
    node.0 as usize
}

fn collect_text(nodes: &[NodeData], node: NodeId, out: &mut String) {
    let data = &nodes[idx(node)];
    match data.kind {
        NodeKind::Text => out.push_str(&data.text),
        NodeKind::Other => {}
        NodeKind::Element | NodeKind::Fragment => {
            if data.children.is_empty() {
                if let Some(html) = &data.inner_html {
                    out.push_str(html);
                }
            }
            for child in &data.children {
                collect_text(nodes, *child, out);
            }
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.nodes.borrow().len())
            .field("live_updates", &self.live_updates.get())
            .finish()
    }
}

impl ViewAdapter for Document {
    fn contains(&self, node: NodeId) -> bool {
        idx(node) < self.nodes.borrow().len()
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes.borrow()[idx(node)].kind
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes.borrow()[idx(node)].children.clone()
    }

    fn attributes(&self, node: NodeId) -> Vec<Attribute> {
        self.nodes.borrow()[idx(node)].attrs.clone()
    }

    fn text(&self, node: NodeId) -> String {
        self.nodes.borrow()[idx(node)].text.clone()
    }

    fn value(&self, node: NodeId) -> String {
        self.nodes.borrow()[idx(node)].value.clone()
    }

    fn query(&self, selector: &str) -> Option<NodeId> {
        let selector = selector.trim();
        if let Some(id) = selector.strip_prefix('#') {
            self.find(|n| n.attrs.iter().any(|a| a.name == "id" && a.value == id))
        } else if let Some(class) = selector.strip_prefix('.') {
            self.find(|n| {
                n.attrs
                    .iter()
                    .any(|a| a.name == "class" && a.value.split_whitespace().any(|c| c == class))
            })
        } else {
            self.find(|n| n.kind == NodeKind::Element && n.tag.eq_ignore_ascii_case(selector))
        }
    }

    fn create_fragment(&self) -> NodeId {
        self.push(NodeData::new(NodeKind::Fragment))
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let moved = if nodes[idx(child)].kind == NodeKind::Fragment {
            std::mem::take(&mut nodes[idx(child)].children)
        } else {
            Self::detach(&mut nodes, child);
            vec![child]
        };
        for node in moved {
            nodes[idx(node)].parent = Some(parent);
            nodes[idx(parent)].children.push(node);
        }
    }

    fn set_value(&self, node: NodeId, value: &str) {
        self.nodes.borrow_mut()[idx(node)].value = value.to_owned();
        self.record_update(node);
    }

    fn set_inner_html(&self, node: NodeId, html: &str) {
        {
            let mut nodes = self.nodes.borrow_mut();
            let children = std::mem::take(&mut nodes[idx(node)].children);
            for child in children {
                nodes[idx(child)].parent = None;
            }
            nodes[idx(node)].inner_html = Some(html.to_owned());
        }
        self.record_update(node);
    }

    fn set_text(&self, node: NodeId, text: &str) {
        let is_text = self.kind(node) == NodeKind::Text;
        if is_text {
            self.nodes.borrow_mut()[idx(node)].text = text.to_owned();
        } else {
            let fresh = self.text_node(text);
            let mut nodes = self.nodes.borrow_mut();
            for child in std::mem::take(&mut nodes[idx(node)].children) {
                nodes[idx(child)].parent = None;
            }
            nodes[idx(node)].inner_html = None;
            nodes[idx(fresh)].parent = Some(node);
            nodes[idx(node)].children.push(fresh);
        }
        self.record_update(node);
    }

    fn add_listener(&self, node: NodeId, event: &str, listener: Listener) {
        self.nodes.borrow_mut()[idx(node)]
            .listeners
            .push((event.to_owned(), listener));
    }
}
