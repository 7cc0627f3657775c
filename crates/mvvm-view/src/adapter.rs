#![forbid(unsafe_code)]

//! The [`ViewAdapter`] trait and the types that cross it.

use std::fmt;
use std::rc::Rc;

/// Opaque handle to a node owned by a [`ViewAdapter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of node a [`NodeId`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Carries attributes and children.
    Element,
    /// Carries text content only.
    Text,
    /// Off-tree staging container.
    Fragment,
    /// Anything the compiler should skip (comments, processing instructions).
    Other,
}

/// A name/value attribute pair, in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An event delivered to a [`Listener`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    /// Event name, such as `"input"` or `"click"`.
    pub name: String,
    /// Node the event was dispatched on.
    pub target: NodeId,
    /// The target's value at dispatch time.
    pub value: String,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target,
            value: value.into(),
        }
    }
}

/// Error raised by a listener. Adapters collect these; callers may downcast.
pub type ListenerError = Box<dyn std::error::Error + 'static>;

/// Event callback registered on a node.
pub type Listener = Rc<dyn Fn(&Event) -> Result<(), ListenerError>>;

/// Mutation and traversal primitives the binding engine needs from a view.
///
/// All methods take `&self`: updates arrive from watcher callbacks that hold a
/// shared handle to the adapter, so implementations use interior mutability.
/// Implementations must not hold internal borrows while invoking listeners.
pub trait ViewAdapter {
    /// Whether `node` refers to a node this adapter owns. Every other method
    /// may assume it does.
    fn contains(&self, node: NodeId) -> bool;

    fn kind(&self, node: NodeId) -> NodeKind;

    /// Child nodes in order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Attributes in document order. Empty for non-elements.
    fn attributes(&self, node: NodeId) -> Vec<Attribute>;

    /// Text content of a text node.
    fn text(&self, node: NodeId) -> String;

    /// Current value of an input-like element.
    fn value(&self, node: NodeId) -> String;

    /// Find a node by selector. Supported syntax is adapter-defined.
    fn query(&self, selector: &str) -> Option<NodeId>;

    /// Create an empty off-tree fragment.
    fn create_fragment(&self) -> NodeId;

    /// Move `child` to the end of `parent`'s children. Appending a fragment
    /// moves the fragment's children instead, leaving it empty.
    fn append_child(&self, parent: NodeId, child: NodeId);

    fn set_value(&self, node: NodeId, value: &str);

    /// Replace a node's content with raw markup.
    fn set_inner_html(&self, node: NodeId, html: &str);

    fn set_text(&self, node: NodeId, text: &str);

    fn add_listener(&self, node: NodeId, event: &str, listener: Listener);
}
