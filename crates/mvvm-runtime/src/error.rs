#![forbid(unsafe_code)]

//! Compile-time and session errors.

use mvvm_core::ReactiveError;
use mvvm_view::NodeId;
use thiserror::Error;

use crate::config::ConfigError;
use crate::vm::ViewRoot;

/// A binding the compiler could not install.
///
/// These never abort compilation; the compiler records them and moves on to
/// the next attribute or node.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("unknown directive `{directive}` in attribute `{attribute}` on node {node}")]
    UnknownDirective {
        directive: String,
        attribute: String,
        node: NodeId,
    },

    #[error("attribute `{attribute}` on node {node} needs an event name")]
    MissingEventName { attribute: String, node: NodeId },

    #[error("binding `{expression}` on node {node} failed: {source}")]
    Binding {
        expression: String,
        node: NodeId,
        source: ReactiveError,
    },
}

impl CompileError {
    /// Node the failed binding was declared on.
    #[must_use]
    pub fn node(&self) -> NodeId {
        match self {
            Self::UnknownDirective { node, .. }
            | Self::MissingEventName { node, .. }
            | Self::Binding { node, .. } => *node,
        }
    }
}

/// Errors raised by a [`Vm`](crate::Vm) or by the listeners it installs.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("view root {root} not found")]
    RootNotFound { root: ViewRoot },

    #[error("session data must be an object, found {found}")]
    DataNotObject { found: &'static str },

    #[error("method `{name}` is not defined")]
    MissingMethod { name: String },

    #[error("session was dropped before the event fired")]
    SessionDropped,

    #[error("invalid interpolation delimiters: {0}")]
    Delimiters(#[from] regex::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Reactive(#[from] ReactiveError),
}
