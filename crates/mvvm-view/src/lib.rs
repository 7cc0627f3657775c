#![forbid(unsafe_code)]

//! View adapter boundary for the mvvm binding engine.
//!
//! The binding engine never touches a concrete view tree. It talks to a
//! [`ViewAdapter`], which exposes the handful of primitives compilation and
//! updates need: walking nodes, reading attributes and text, staging nodes in
//! an off-tree fragment, pushing values into nodes, and listening for events.
//!
//! [`Document`] is an in-memory adapter. It backs the test suites and is
//! usable by embedders that render the tree themselves.

pub mod adapter;
pub mod document;

pub use adapter::{Attribute, Event, Listener, ListenerError, NodeId, NodeKind, ViewAdapter};
pub use document::{DispatchError, Document};
