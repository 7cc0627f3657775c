#![forbid(unsafe_code)]

//! Reactive data binding for view trees.
//!
//! This crate re-exports the engine's three layers:
//!
//! | Crate | Provides |
//! |-------|----------|
//! | `mvvm-core` | [`Object`], [`Value`], [`Dep`], [`Watcher`], path access |
//! | `mvvm-view` | The [`ViewAdapter`] seam and the in-memory [`Document`] |
//! | `mvvm-runtime` | Directives, the template [`Compiler`], and the [`Vm`] session |
//!
//! Most users only need the prelude:
//!
//! ```ignore
//! use mvvm::prelude::*;
//!
//! let doc = Rc::new(Document::new());
//! let app = doc.append(doc.root(), doc.element("div", &[("id", "app")]));
//! doc.append(app, doc.text_node("Hello {{ name }}"));
//!
//! let vm = Vm::new(VmOptions::new().el("#app").data(json!({"name": "x"})), doc.clone())?;
//! vm.set("name", "y".into())?;
//! assert_eq!(doc.text_content(app), "Hello y");
//! ```

pub use mvvm_core::{
    ComputedFn, Dep, DepId, NotifyError, Object, PathError, ReactiveError, UpdateFailure, Value,
    Watcher, assign, is_tracking, resolve, untracked,
};
pub use mvvm_runtime::{
    BindingDescriptor, CompileError, CompileOutput, Compiler, ConfigError, Delimiters, Directive,
    Interpolator, Method, MethodInvoker, RuntimeConfig, Updater, ViewRoot, Vm, VmError, VmOptions,
};
pub use mvvm_view::{
    Attribute, DispatchError, Document, Event, Listener, ListenerError, NodeId, NodeKind,
    ViewAdapter,
};

/// Common imports for building a session.
pub mod prelude {
    pub use std::rc::Rc;

    pub use crate::{
        CompileError, Document, Event, NodeId, Object, RuntimeConfig, Value, ViewAdapter, Vm,
        VmError, VmOptions,
    };
}
